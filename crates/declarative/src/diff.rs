//! Diff computation for resources

use crate::resource::Resource;
use crate::types::{LiveState, ResourceId, ResourceType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One attribute whose live value differs from the declared one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    pub resource: ResourceId,
    pub attribute: String,
    pub desired: String,
    /// `None` when the provider reported no value
    pub observed: Option<String>,
}

impl Diff {
    /// Check if this diff sets a value the system does not have yet
    pub fn is_addition(&self) -> bool {
        self.observed.is_none()
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.observed {
            Some(observed) => write!(
                f,
                "{} {}: {} -> {}",
                self.resource, self.attribute, observed, self.desired
            ),
            None => write!(
                f,
                "{} {}: (unset) -> {}",
                self.resource, self.attribute, self.desired
            ),
        }
    }
}

/// Compare a resource's declared attributes against its live state
///
/// Attributes the live state carries but the resource does not declare
/// are ignored. Diffs come out in attribute order.
pub fn compute(resource: &Resource, live: &LiveState) -> Vec<Diff> {
    resource
        .attributes
        .iter()
        .filter(|(attribute, desired)| live.get(attribute) != Some(desired.as_str()))
        .map(|(attribute, desired)| Diff {
            resource: resource.id.clone(),
            attribute: attribute.clone(),
            desired: desired.clone(),
            observed: live.get(attribute).map(ToString::to_string),
        })
        .collect()
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of resources with at least one diff
    pub resources: usize,
    /// Attributes not yet set on the system
    pub additions: usize,
    /// Attributes set to a different value
    pub modifications: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[Diff]) -> Self {
        let mut summary = Self::default();
        let mut last: Option<&ResourceId> = None;
        for diff in diffs {
            if last != Some(&diff.resource) {
                summary.resources += 1;
                last = Some(&diff.resource);
            }
            if diff.is_addition() {
                summary.additions += 1;
            } else {
                summary.modifications += 1;
            }
        }
        summary
    }

    /// Total number of attribute changes
    pub fn total(&self) -> usize {
        self.additions + self.modifications
    }

    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource type
pub fn group_by_type(diffs: &[Diff]) -> BTreeMap<ResourceType, Vec<&Diff>> {
    let mut groups: BTreeMap<ResourceType, Vec<&Diff>> = BTreeMap::new();
    for diff in diffs {
        groups.entry(diff.resource.kind).or_default().push(diff);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Attributes;

    fn kdump() -> Resource {
        Resource::new(ResourceId::service("kdump"), "kdump")
            .with("ensure", "stopped")
            .with("enable", "false")
    }

    fn live(pairs: &[(&str, &str)]) -> LiveState {
        LiveState::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Attributes>(),
        )
    }

    #[test]
    fn test_matching_state_has_no_diff() {
        let state = live(&[("ensure", "stopped"), ("enable", "false"), ("pid", "0")]);
        assert!(compute(&kdump(), &state).is_empty());
    }

    #[test]
    fn test_diff_per_attribute() {
        let diffs = compute(&kdump(), &live(&[("ensure", "running")]));

        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs[0].attribute, "enable");
        assert_eq!(diffs[0].observed, None);
        assert_eq!(diffs[1].attribute, "ensure");
        assert_eq!(diffs[1].observed.as_deref(), Some("running"));
        assert_eq!(
            diffs[1].to_string(),
            "Service[kdump] ensure: running -> stopped"
        );

        let summary = DiffSummary::from_diffs(&diffs);
        assert_eq!(summary.resources, 1);
        assert_eq!(summary.additions, 1);
        assert_eq!(summary.modifications, 1);
        assert!(summary.has_changes());
    }

    #[test]
    fn test_group_by_type() {
        let package = Resource::new(ResourceId::package("kexec-tools"), "kdump")
            .with("ensure", "present");
        let mut diffs = compute(&kdump(), &LiveState::default());
        diffs.extend(compute(&package, &LiveState::default()));

        let groups = group_by_type(&diffs);
        assert_eq!(groups[&ResourceType::Service].len(), 2);
        assert_eq!(groups[&ResourceType::Package].len(), 1);
    }
}
