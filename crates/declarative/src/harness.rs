//! Supported-OS fact fixtures and a matrix runner
//!
//! Each fixture carries both structured (`os.*`) and legacy flat facts,
//! the shape a fact collector reports for that platform.

use crate::compiler;
use crate::facts::FactStore;
use crate::registry::ProfileRegistry;
use crate::resource::Catalog;

/// Fact set for one supported platform
#[derive(Debug, Clone)]
pub struct OsFixture {
    /// Label such as `centos-7-x86_64`
    pub label: String,
    pub facts: FactStore,
}

impl OsFixture {
    fn new(family: &str, name: &str, major: &str, full: &str, arch: &str) -> Self {
        let label = format!("{}-{major}-{arch}", name.to_lowercase());
        let facts = FactStore::from_pairs([
            ("os.family", family),
            ("os.name", name),
            ("os.release.major", major),
            ("os.release.full", full),
            ("os.architecture", arch),
            ("kernel", "Linux"),
            ("osfamily", family),
            ("operatingsystem", name),
            ("operatingsystemmajrelease", major),
            ("architecture", arch),
        ]);
        Self { label, facts }
    }
}

/// Platforms the built-in profiles are checked against
pub fn supported_os() -> Vec<OsFixture> {
    vec![
        OsFixture::new("RedHat", "CentOS", "7", "7.6.1810", "x86_64"),
        OsFixture::new("RedHat", "RedHat", "7", "7.6", "x86_64"),
        OsFixture::new("RedHat", "Fedora", "28", "28", "x86_64"),
    ]
}

/// Result of one fixture in a matrix run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixCase {
    pub label: String,
    /// `None` when compilation and the check both succeeded
    pub failure: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MatrixReport {
    pub cases: Vec<MatrixCase>,
}

impl MatrixReport {
    pub fn is_success(&self) -> bool {
        self.cases.iter().all(|c| c.failure.is_none())
    }

    pub fn failures(&self) -> impl Iterator<Item = &MatrixCase> {
        self.cases.iter().filter(|c| c.failure.is_some())
    }
}

/// Compile `profile` for every fixture and run `check` on each catalog
///
/// Compilation errors count as failures for that fixture; the run
/// continues with the next one.
pub fn run_matrix<F>(
    registry: &ProfileRegistry,
    profile: &str,
    fixtures: &[OsFixture],
    check: F,
) -> MatrixReport
where
    F: Fn(&OsFixture, &Catalog) -> Result<(), String>,
{
    let cases = fixtures
        .iter()
        .map(|fixture| {
            let failure = match compiler::compile(registry, profile, &fixture.facts) {
                Ok(catalog) => check(fixture, &catalog).err(),
                Err(e) => Some(format!("compilation failed: {e}")),
            };
            if let Some(reason) = &failure {
                log::warn!("{} on {}: {reason}", profile, fixture.label);
            }
            MatrixCase {
                label: fixture.label.clone(),
                failure,
            }
        })
        .collect();

    MatrixReport { cases }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::OsFamily;
    use crate::profile::{FactPredicate, Profile, ResourceTemplate, Rule};
    use crate::types::ResourceId;

    #[test]
    fn test_supported_os_labels() {
        let labels: Vec<_> = supported_os().into_iter().map(|f| f.label).collect();
        assert_eq!(labels, ["centos-7-x86_64", "redhat-7-x86_64", "fedora-28-x86_64"]);
    }

    #[test]
    fn test_fixtures_are_redhat_family() {
        for fixture in supported_os() {
            assert_eq!(fixture.facts.os_family(), Some(OsFamily::RedHat));
            assert_eq!(fixture.facts.get("os.architecture"), Some("x86_64"));
        }
    }

    #[test]
    fn test_matrix_collects_failures_per_os() {
        let registry = ProfileRegistry::builder()
            .register(
                Profile::new("el7").rule(
                    Rule::when(FactPredicate::equals("os.release.major", "7")).declare(
                        ResourceTemplate::new(ResourceId::service("kdump"))
                            .with("ensure", "stopped"),
                    ),
                ),
            )
            .unwrap()
            .build();

        let report = run_matrix(&registry, "el7", &supported_os(), |_, catalog| {
            if catalog.len() == 1 {
                Ok(())
            } else {
                Err(format!("expected 1 resource, got {}", catalog.len()))
            }
        });

        assert!(!report.is_success());
        let failed: Vec<_> = report.failures().map(|c| c.label.as_str()).collect();
        assert_eq!(failed, ["fedora-28-x86_64"]);
    }
}
