//! Post-apply verification
//!
//! Re-reads live state and checks it against the catalog. Takes only a
//! [`StateReader`], so verification cannot change the system.

use crate::diff::{self, Diff};
use crate::executor::{ReconcileOptions, Workers};
use crate::provider::{Session, StateReader};
use crate::resource::Catalog;
use crate::types::ResourceId;
use serde::Serialize;
use std::collections::BTreeMap;

/// Verdict for a single resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceVerdict {
    pub passed: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mismatches: Vec<Diff>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Pass/fail per catalog resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub verdicts: BTreeMap<ResourceId, ResourceVerdict>,
}

impl VerificationReport {
    pub fn all_passed(&self) -> bool {
        self.verdicts.values().all(|v| v.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&ResourceId, &ResourceVerdict)> {
        self.verdicts.iter().filter(|(_, v)| !v.passed)
    }

    pub fn get(&self, id: &ResourceId) -> Option<&ResourceVerdict> {
        self.verdicts.get(id)
    }

    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }
}

/// Check every catalog resource against freshly read live state
pub fn verify<R>(catalog: &Catalog, reader: &R, options: &ReconcileOptions) -> VerificationReport
where
    R: StateReader + ?Sized,
{
    let session = Session::new(reader, options.timeout, options.retry.clone());
    let workers = Workers::new(options.jobs);

    let verdicts = workers.map(catalog.resources(), |resource| {
        let verdict = match session.get_state(&resource.id) {
            Ok(live) => {
                let mismatches = diff::compute(resource, &live);
                ResourceVerdict {
                    passed: mismatches.is_empty(),
                    mismatches,
                    error: None,
                }
            }
            Err(e) => ResourceVerdict {
                passed: false,
                mismatches: Vec::new(),
                error: Some(e.to_string()),
            },
        };
        (resource.id.clone(), verdict)
    });

    let report = VerificationReport {
        verdicts: verdicts.into_iter().collect(),
    };
    log::info!(
        "Verified {} resources: {} failed",
        report.len(),
        report.failures().count()
    );
    report
}
