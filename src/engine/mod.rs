//! Terminal front end for the declarative engine
//!
//! 1. Diffing - show how live state differs from the catalog
//! 2. Executing - confirm, apply with a progress bar, summarize
//! 3. Verifying - show per-resource verdicts

pub mod differ;
pub mod executor;

pub use differ::{display_diff, display_verification};
pub use executor::{ExecuteOptions, execute};
