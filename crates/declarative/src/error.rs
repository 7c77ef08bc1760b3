//! Error types for profile compilation and reconciliation.
//!
//! Errors fall into two groups. Compile-time errors abort before any
//! provider is touched and always reach the caller. Provider errors are
//! scoped to a single resource; the engine captures them into that
//! resource's outcome instead of propagating them.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Categories of errors, used for retry decisions and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Raised while loading facts or compiling a catalog
    Compile,
    /// Raised by a resource provider for a single resource
    Provider,
    /// Filesystem errors while reading facts, profiles or state
    Io,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Compile => "Catalog compilation failed",
            Self::Provider => "Resource provider error",
            Self::Io => "I/O error",
        }
    }
}

/// Errors produced by the declarative engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Facts could not be parsed
    #[error("malformed facts: {message}")]
    MalformedFacts {
        /// Parser message or structural problem
        message: String,
    },

    /// Profile name is not registered
    #[error("unknown profile: {name}")]
    UnknownProfile {
        /// Requested profile name
        name: String,
    },

    /// None of the profile's rules match the facts
    #[error("profile {profile} has no branch for {os}")]
    UnsupportedOs {
        /// Profile that failed to match
        profile: String,
        /// Short description of the node's OS facts
        os: String,
    },

    /// Two declarations of one resource disagree on an attribute
    #[error(
        "conflicting declarations of {resource}: {attribute} = {first} (from {first_profile}) vs {second} (from {second_profile})"
    )]
    ConflictingResource {
        /// Resource identity, e.g. `Service[kdump]`
        resource: String,
        /// Attribute with disagreeing values
        attribute: String,
        /// Value from the earlier declaration
        first: String,
        /// Profile of the earlier declaration
        first_profile: String,
        /// Value from the later declaration
        second: String,
        /// Profile of the later declaration
        second_profile: String,
    },

    /// Attribute name or value outside the resource type's domain
    #[error("invalid attribute on {resource}: {attribute} = {value} (expected one of: {allowed})")]
    InvalidAttribute {
        /// Resource identity
        resource: String,
        /// Attribute name
        attribute: String,
        /// Offending value
        value: String,
        /// Comma-separated list of accepted values or attributes
        allowed: String,
    },

    /// A `requires` edge names a resource that is not in the catalog
    #[error("{resource} requires {requires}, which is not in the catalog")]
    UnresolvedDependency {
        /// Resource declaring the dependency
        resource: String,
        /// Missing dependency
        requires: String,
    },

    /// Resource dependencies form a cycle
    #[error("dependency cycle between: {}", .resources.join(", "))]
    DependencyCycle {
        /// Resources that could not be ordered
        resources: Vec<String>,
    },

    /// Profiles include each other
    #[error("include cycle: {}", .chain.join(" -> "))]
    IncludeCycle {
        /// Include chain ending with the repeated profile
        chain: Vec<String>,
    },

    /// A profile was registered twice
    #[error("profile already registered: {name}")]
    DuplicateProfile {
        /// Duplicated profile name
        name: String,
    },

    /// Profile definition file could not be parsed
    #[error("invalid profile definition{}: {message}", .path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    ProfileDefinition {
        /// File the definition came from, if any
        path: Option<PathBuf>,
        /// Parser message
        message: String,
    },

    /// Resource reference could not be parsed
    #[error("invalid resource reference: {0} (expected Type[name])")]
    InvalidResourceId(String),

    /// Provider call exceeded its timeout
    #[error("provider timed out after {}ms on {resource}", .timeout.as_millis())]
    ProviderTimeout {
        /// Resource being queried or changed
        resource: String,
        /// Timeout that was exceeded
        timeout: Duration,
    },

    /// Provider failed to read or change a resource
    #[error("provider error on {resource}: {message}")]
    ProviderState {
        /// Resource being queried or changed
        resource: String,
        /// Provider message
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::ProviderTimeout { .. } | Error::ProviderState { .. } => ErrorCategory::Provider,
            Error::Io(_) => ErrorCategory::Io,
            _ => ErrorCategory::Compile,
        }
    }

    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ProviderTimeout { .. })
    }

    /// Whether this error must abort before any provider is touched.
    pub fn is_compile_time(&self) -> bool {
        self.category() == ErrorCategory::Compile
    }
}

/// Result type for declarative operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_timeouts_are_retryable() {
        let timeout = Error::ProviderTimeout {
            resource: "Service[kdump]".into(),
            timeout: Duration::from_millis(50),
        };
        let state = Error::ProviderState {
            resource: "Service[kdump]".into(),
            message: "unit not found".into(),
        };
        assert!(timeout.is_retryable());
        assert!(!state.is_retryable());
        assert_eq!(state.category(), ErrorCategory::Provider);
    }

    #[test]
    fn test_compile_errors_are_fatal() {
        let err = Error::UnknownProfile {
            name: "nope".into(),
        };
        assert!(err.is_compile_time());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_messages() {
        let err = Error::IncludeCycle {
            chain: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "include cycle: a -> b -> a");

        let err = Error::ProfileDefinition {
            path: None,
            message: "missing field `name`".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid profile definition: missing field `name`"
        );
    }
}
