//! Profile compiler - (profile, facts) -> catalog
//!
//! Compilation is a pure function of the registry, the profile name and
//! the facts. It never touches a provider, so a failed compilation has no
//! side effects.

use crate::error::{Error, Result};
use crate::facts::FactStore;
use crate::profile::ResourceTemplate;
use crate::registry::ProfileRegistry;
use crate::resource::{Catalog, Resource};
use crate::schema;

/// Compile a registered profile against a node's facts
pub fn compile(registry: &ProfileRegistry, profile: &str, facts: &FactStore) -> Result<Catalog> {
    let mut compilation = Compilation {
        registry,
        facts,
        evaluated: Vec::new(),
        stack: Vec::new(),
        resources: Vec::new(),
    };
    compilation.evaluate(profile)?;

    log::debug!(
        "Compiled {} for {}: {} resources from {} profiles",
        profile,
        facts.describe_os(),
        compilation.resources.len(),
        compilation.evaluated.len()
    );

    Catalog::new(
        profile.to_string(),
        compilation.evaluated,
        compilation.resources,
    )
}

struct Compilation<'a> {
    registry: &'a ProfileRegistry,
    facts: &'a FactStore,
    /// Profiles in the order evaluation started
    evaluated: Vec<String>,
    /// Current include chain
    stack: Vec<String>,
    resources: Vec<Resource>,
}

impl Compilation<'_> {
    fn evaluate(&mut self, name: &str) -> Result<()> {
        if self.stack.iter().any(|p| p == name) {
            let mut chain = self.stack.clone();
            chain.push(name.to_string());
            return Err(Error::IncludeCycle { chain });
        }
        if self.evaluated.iter().any(|p| p == name) {
            return Ok(());
        }

        let registry = self.registry;
        let profile = registry.get(name).ok_or_else(|| Error::UnknownProfile {
            name: name.to_string(),
        })?;

        self.evaluated.push(name.to_string());
        self.stack.push(name.to_string());
        for include in &profile.includes {
            self.evaluate(include)?;
        }
        self.stack.pop();

        let facts = self.facts;
        let mut matched = false;
        for rule in profile.rules.iter().filter(|r| r.when.matches(facts)) {
            matched = true;
            for template in &rule.resources {
                self.declare(template, name)?;
            }
        }

        if !profile.rules.is_empty() && !matched {
            return Err(Error::UnsupportedOs {
                profile: name.to_string(),
                os: facts.describe_os(),
            });
        }

        Ok(())
    }

    /// Add a template to the catalog, merging with an earlier declaration
    /// of the same identity when the attributes agree
    fn declare(&mut self, template: &ResourceTemplate, profile: &str) -> Result<()> {
        schema::validate(&template.id, &template.attributes)?;

        let Some(existing) = self.resources.iter_mut().find(|r| r.id == template.id) else {
            let mut resource = Resource::new(template.id.clone(), profile);
            resource.attributes = template.attributes.clone();
            for required in &template.requires {
                resource = resource.requiring(required.clone());
            }
            self.resources.push(resource);
            return Ok(());
        };

        for (attribute, value) in &template.attributes {
            match existing.attributes.get(attribute) {
                Some(current) if current != value => {
                    return Err(Error::ConflictingResource {
                        resource: template.id.to_string(),
                        attribute: attribute.clone(),
                        first: current.clone(),
                        first_profile: existing.declared_by.clone(),
                        second: value.clone(),
                        second_profile: profile.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    existing
                        .attributes
                        .insert(attribute.clone(), value.clone());
                }
            }
        }

        for required in &template.requires {
            if !existing.requires.contains(required) {
                existing.requires.push(required.clone());
            }
        }

        log::debug!("Merged duplicate declaration of {} from {}", template.id, profile);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner;
    use crate::profile::{FactPredicate, Profile, Rule};
    use crate::types::ResourceId;

    fn centos7() -> FactStore {
        FactStore::from_pairs([
            ("os.family", "RedHat"),
            ("os.name", "CentOS"),
            ("os.release.major", "7"),
        ])
    }

    fn service(name: &str, ensure: &str) -> ResourceTemplate {
        ResourceTemplate::new(ResourceId::service(name)).with("ensure", ensure)
    }

    fn registry(profiles: Vec<Profile>) -> ProfileRegistry {
        profiles
            .into_iter()
            .try_fold(ProfileRegistry::builder().with_builtins(), |b, p| {
                b.register(p)
            })
            .unwrap()
            .build()
    }

    #[test]
    fn test_compile_kdump() {
        let catalog = compile(&ProfileRegistry::builtin(), "kdump", &centos7()).unwrap();

        assert!(catalog.contains_profile("kdump"));
        assert_eq!(catalog.len(), 1);
        let kdump = &catalog.resources()[0];
        assert_eq!(kdump.id, ResourceId::service("kdump"));
        assert_eq!(kdump.attribute("ensure"), Some("stopped"));
        assert_eq!(kdump.attribute("enable"), Some("false"));
    }

    #[test]
    fn test_compile_is_deterministic() {
        let registry = ProfileRegistry::builtin();
        let first = compile(&registry, "kdump", &centos7()).unwrap();
        let _ = compile(&registry, "kdump", &FactStore::default()).unwrap();
        let second = compile(&registry, "kdump", &centos7()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.digest(), second.digest());
    }

    #[test]
    fn test_unknown_profile() {
        let err = compile(&ProfileRegistry::builtin(), "ntp", &centos7()).unwrap_err();
        assert!(matches!(err, Error::UnknownProfile { name } if name == "ntp"));
    }

    #[test]
    fn test_unknown_include() {
        let registry = registry(vec![Profile::new("base").include("missing")]);
        let err = compile(&registry, "base", &centos7()).unwrap_err();
        assert!(matches!(err, Error::UnknownProfile { name } if name == "missing"));
    }

    #[test]
    fn test_unsupported_os() {
        let registry = registry(vec![
            Profile::new("redhat_only").rule(
                Rule::when(FactPredicate::equals("os.family", "RedHat"))
                    .declare(service("kdump", "stopped")),
            ),
        ]);
        let debian = FactStore::from_pairs([("os.family", "Debian")]);

        let err = compile(&registry, "redhat_only", &debian).unwrap_err();
        assert!(
            matches!(err, Error::UnsupportedOs { ref profile, .. } if profile == "redhat_only")
        );
        assert!(err.to_string().contains("Debian"));
    }

    #[test]
    fn test_os_specific_branches() {
        let registry = registry(vec![
            Profile::new("chrony")
                .rule(
                    Rule::when(FactPredicate::one_of("os.release.major", &["7", "8"]))
                        .declare(service("chronyd", "running")),
                )
                .rule(
                    Rule::when(FactPredicate::equals("os.release.major", "6"))
                        .declare(service("ntpd", "running")),
                ),
        ]);

        let catalog = compile(&registry, "chrony", &centos7()).unwrap();
        assert_eq!(catalog.resources()[0].id, ResourceId::service("chronyd"));

        let el6 = FactStore::from_pairs([("os.release.major", "6")]);
        let catalog = compile(&registry, "chrony", &el6).unwrap();
        assert_eq!(catalog.resources()[0].id, ResourceId::service("ntpd"));
    }

    #[test]
    fn test_includes_are_deduplicated() {
        let registry = registry(vec![
            Profile::new("controller").include("kdump").include("compute"),
            Profile::new("compute").include("kdump").rule(
                Rule::always().declare(
                    ResourceTemplate::new(ResourceId::service("kdump")).with("enable", "false"),
                ),
            ),
        ]);

        let catalog = compile(&registry, "controller", &centos7()).unwrap();
        assert_eq!(catalog.profiles(), ["controller", "kdump", "compute"]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.resources()[0].declared_by, "kdump");
    }

    #[test]
    fn test_conflicting_declarations() {
        let registry = registry(vec![
            Profile::new("debugging").rule(Rule::always().declare(service("kdump", "running"))),
            Profile::new("node").include("kdump").include("debugging"),
        ]);

        match compile(&registry, "node", &centos7()).unwrap_err() {
            Error::ConflictingResource {
                resource,
                attribute,
                first_profile,
                second_profile,
                ..
            } => {
                assert_eq!(resource, "Service[kdump]");
                assert_eq!(attribute, "ensure");
                assert_eq!(first_profile, "kdump");
                assert_eq!(second_profile, "debugging");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_include_cycle() {
        let registry = registry(vec![
            Profile::new("a").include("b"),
            Profile::new("b").include("a"),
        ]);
        let err = compile(&registry, "a", &centos7()).unwrap_err();
        assert!(matches!(err, Error::IncludeCycle { chain } if chain == ["a", "b", "a"]));
    }

    #[test]
    fn test_invalid_attribute_fails_compilation() {
        let registry = registry(vec![
            Profile::new("broken").rule(Rule::always().declare(service("kdump", "paused"))),
        ]);
        let err = compile(&registry, "broken", &centos7()).unwrap_err();
        assert!(matches!(err, Error::InvalidAttribute { .. }));
    }

    #[test]
    fn test_dependencies_are_layered() {
        let registry = registry(vec![
            Profile::new("crashdump").include("kdump").rule(
                Rule::always()
                    .declare(
                        ResourceTemplate::new(ResourceId::package("kexec-tools"))
                            .with("ensure", "present"),
                    )
                    .declare(
                        ResourceTemplate::new(ResourceId::service("kdump"))
                            .requiring(ResourceId::package("kexec-tools")),
                    ),
            ),
        ]);

        let catalog = compile(&registry, "crashdump", &centos7()).unwrap();
        assert_eq!(catalog.resources()[0].id, ResourceId::service("kdump"));
        assert_eq!(catalog.layers(), [vec![1], vec![0]]);

        let services = planner::filter_by_target(&catalog, Some("service")).unwrap();
        assert_eq!(services.len(), 1);
        assert!(services.resources()[0].requires.is_empty());
    }

    #[test]
    fn test_unresolved_dependency() {
        let registry = registry(vec![
            Profile::new("dangling").rule(
                Rule::always().declare(
                    service("kdump", "stopped").requiring(ResourceId::package("kexec-tools")),
                ),
            ),
        ]);
        let err = compile(&registry, "dangling", &centos7()).unwrap_err();
        assert!(matches!(err, Error::UnresolvedDependency { .. }));
    }
}
