//! # Declarative
//!
//! Compile profiles against node facts into a catalog of desired
//! resources, compare it with live state, and converge the difference.
//!
//! ## Core Concepts
//!
//! - **FactStore**: immutable key/value facts describing a node
//! - **Profile**: named bundle of fact-guarded rules that declare resources
//! - **Catalog**: ordered, deduplicated resources compiled for one node
//! - **Provider**: adapter that reads and sets live resource state
//! - **Reconciliation**: per-resource diff between catalog and live state
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{
//!     FactStore, MemoryProvider, ProfileRegistry, ReconcileOptions,
//!     apply, compile, reconcile, verify,
//! };
//!
//! let facts = FactStore::from_pairs([("os.family", "RedHat"), ("os.release.major", "7")]);
//! let catalog = compile(&ProfileRegistry::builtin(), "kdump", &facts)?;
//!
//! let provider = MemoryProvider::new();
//! let options = ReconcileOptions::default();
//! let outcomes = apply(&reconcile(&catalog, &provider, &options), &provider, &options);
//!
//! assert!(verify(&catalog, &provider, &options).all_passed());
//! ```
//!
//! ## Provider Traits
//!
//! - [`StateReader`]: reads live state; all that verification gets
//! - [`Provider`]: also converges state
//! - [`ProgressCallback`]: receives apply progress
//!
//! Providers report whether they tolerate concurrent calls; the engine
//! serializes calls to those that do not.

pub mod compiler;
pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod facts;
pub mod harness;
pub mod memory;
pub mod planner;
pub mod profile;
pub mod provider;
pub mod registry;
pub mod resource;
pub mod retry;
pub mod schema;
pub mod types;
pub mod verify;

// Re-export main types at crate root
pub use compiler::compile;
pub use context::{CancellationToken, NoProgress, ProgressCallback};
pub use diff::{Diff, DiffSummary, group_by_type};
pub use error::{Error, ErrorCategory, Result};
pub use executor::{
    ReconcileOptions, Reconciliation, ResourceCheck, ResourceOutcome, apply, apply_with_progress,
    reconcile, summarize,
};
pub use facts::{FactFormat, FactStore, OsFamily};
pub use harness::{MatrixReport, OsFixture, run_matrix, supported_os};
pub use memory::MemoryProvider;
pub use planner::filter_by_target;
pub use profile::{FactPredicate, Profile, ResourceTemplate, Rule};
pub use provider::{Provider, StateReader};
pub use registry::{ProfileRegistry, RegistryBuilder};
pub use resource::{Catalog, Resource};
pub use retry::RetryConfig;
pub use types::{
    ApplyResult, Attributes, ExecuteSummary, LiveState, ResourceId, ResourcePhase, ResourceType,
};
pub use verify::{ResourceVerdict, VerificationReport, verify};
