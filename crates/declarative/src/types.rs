//! Core types for declarative resource management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Kind of managed system entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    Service,
    Package,
    File,
}

impl ResourceType {
    pub const ALL: [ResourceType; 3] = [Self::Service, Self::Package, Self::File];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Service => "Service",
            Self::Package => "Package",
            Self::File => "File",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidResourceId(s.to_string()))
    }
}

/// Resource identity: `(type, name)`, rendered as `Service[kdump]`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId {
    pub kind: ResourceType,
    pub name: String,
}

impl ResourceId {
    pub fn new(kind: ResourceType, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn service(name: impl Into<String>) -> Self {
        Self::new(ResourceType::Service, name)
    }

    pub fn package(name: impl Into<String>) -> Self {
        Self::new(ResourceType::Package, name)
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self::new(ResourceType::File, name)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind, self.name)
    }
}

impl FromStr for ResourceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidResourceId(s.to_string());

        let (kind, rest) = s.trim().split_once('[').ok_or_else(invalid)?;
        let name = rest.strip_suffix(']').ok_or_else(invalid)?;
        if name.is_empty() {
            return Err(invalid());
        }

        let kind = kind.parse::<ResourceType>().map_err(|_| invalid())?;
        Ok(Self::new(kind, name))
    }
}

impl TryFrom<String> for ResourceId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.to_string()
    }
}

/// Attribute name -> value, ordered for deterministic output
pub type Attributes = BTreeMap<String, String>;

/// Snapshot of a resource's current attributes as reported by a provider
///
/// An empty snapshot means the provider knows nothing about the resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveState {
    pub attributes: Attributes,
}

impl LiveState {
    pub fn new(attributes: Attributes) -> Self {
        Self { attributes }
    }

    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.attributes.get(attribute).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// Per-resource progress through reconciliation
///
/// `Unknown -> Queried -> {Matched | Diffed} -> {Applied | Skipped | Failed}`
///
/// `Unknown` and `Queried` only exist while a worker holds the resource.
/// A [`ResourceCheck`](crate::ResourceCheck) or
/// [`ResourceOutcome`](crate::ResourceOutcome) is never reported in either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourcePhase {
    /// Not yet looked at
    Unknown,
    /// Live state read, not yet compared
    Queried,
    Matched,
    Diffed,
    Applied,
    Skipped,
    Failed,
}

impl ResourcePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Matched | Self::Applied | Self::Skipped | Self::Failed
        )
    }
}

/// Result of applying a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// Live state already matched
    NoChange,
    /// Provider converged the listed attributes
    Applied { changed: Vec<String> },
    /// Apply was skipped
    Skipped { reason: String },
    /// Apply failed
    Failed { error: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// Phase a resource ends in after this result
    pub fn phase(&self) -> ResourcePhase {
        match self {
            Self::NoChange => ResourcePhase::Matched,
            Self::Applied { .. } => ResourcePhase::Applied,
            Self::Skipped { .. } => ResourcePhase::Skipped,
            Self::Failed { .. } => ResourcePhase::Failed,
        }
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.applied + self.skipped + self.failed + self.no_change
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Applied { .. } => self.applied += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_id_display_and_parse() {
        let id = ResourceId::service("kdump");
        assert_eq!(id.to_string(), "Service[kdump]");
        assert_eq!("Service[kdump]".parse::<ResourceId>().unwrap(), id);
        assert_eq!(
            "package[kexec-tools]".parse::<ResourceId>().unwrap(),
            ResourceId::package("kexec-tools")
        );
        assert_eq!(
            "File[/etc/kdump.conf]".parse::<ResourceId>().unwrap(),
            ResourceId::file("/etc/kdump.conf")
        );
    }

    #[test]
    fn test_resource_id_rejects_garbage() {
        for bad in ["kdump", "Service[]", "Service[kdump", "Mount[/]"] {
            assert!(
                matches!(bad.parse::<ResourceId>(), Err(Error::InvalidResourceId(_))),
                "{bad} should not parse"
            );
        }
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = ExecuteSummary::default();
        summary.add_result(&ApplyResult::NoChange);
        summary.add_result(&ApplyResult::Applied {
            changed: vec!["ensure".into()],
        });
        summary.add_result(&ApplyResult::Failed {
            error: "boom".into(),
        });
        assert_eq!(summary.total(), 3);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_phase_from_result() {
        assert_eq!(ApplyResult::NoChange.phase(), ResourcePhase::Matched);
        assert!(ApplyResult::NoChange.phase().is_terminal());
        assert!(!ResourcePhase::Diffed.is_terminal());
        assert!(!ResourcePhase::Unknown.is_terminal());
        assert!(!ResourcePhase::Queried.is_terminal());
    }
}
