//! Profile definitions
//!
//! A profile is a named bundle of rules. Each rule pairs a fact predicate
//! with resource templates; every rule whose predicate matches the node's
//! facts contributes its templates to the catalog. Profiles may include
//! other profiles.
//!
//! Profiles are defined in Rust (see [`Profile::builtin_kdump`]) or in TOML:
//!
//! ```toml
//! [[profile]]
//! name = "crashdump"
//! includes = ["kdump"]
//!
//! [[profile.rule]]
//! when = { equals = { fact = "os.family", value = "RedHat" } }
//!
//! [[profile.rule.resource]]
//! id = "Package[kexec-tools]"
//! attributes = { ensure = "present" }
//! ```

use crate::facts::FactStore;
use crate::types::{Attributes, ResourceId};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Condition over a node's facts
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactPredicate {
    /// Matches every node
    #[default]
    Always,
    /// Fact is present and equal to `value`
    Equals { fact: String, value: String },
    /// Fact is present and one of `values`
    OneOf { fact: String, values: Vec<String> },
    /// Fact is present
    Present { fact: String },
    /// Fact is absent
    Absent { fact: String },
    All(Vec<FactPredicate>),
    Any(Vec<FactPredicate>),
    Not(Box<FactPredicate>),
}

impl FactPredicate {
    pub fn equals(fact: &str, value: &str) -> Self {
        Self::Equals {
            fact: fact.to_string(),
            value: value.to_string(),
        }
    }

    pub fn one_of(fact: &str, values: &[&str]) -> Self {
        Self::OneOf {
            fact: fact.to_string(),
            values: values.iter().map(ToString::to_string).collect(),
        }
    }

    pub fn matches(&self, facts: &FactStore) -> bool {
        match self {
            Self::Always => true,
            Self::Equals { fact, value } => facts.get(fact) == Some(value.as_str()),
            Self::OneOf { fact, values } => facts
                .get(fact)
                .is_some_and(|v| values.iter().any(|candidate| candidate == v)),
            Self::Present { fact } => facts.contains(fact),
            Self::Absent { fact } => !facts.contains(fact),
            Self::All(predicates) => predicates.iter().all(|p| p.matches(facts)),
            Self::Any(predicates) => predicates.iter().any(|p| p.matches(facts)),
            Self::Not(predicate) => !predicate.matches(facts),
        }
    }
}

/// Desired resource declared by a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTemplate {
    pub id: ResourceId,
    #[serde(default, deserialize_with = "scalar_attributes")]
    pub attributes: Attributes,
    #[serde(default)]
    pub requires: Vec<ResourceId>,
}

impl ResourceTemplate {
    pub fn new(id: ResourceId) -> Self {
        Self {
            id,
            attributes: Attributes::new(),
            requires: Vec::new(),
        }
    }

    pub fn with(mut self, attribute: &str, value: &str) -> Self {
        self.attributes
            .insert(attribute.to_string(), value.to_string());
        self
    }

    pub fn requiring(mut self, id: ResourceId) -> Self {
        self.requires.push(id);
        self
    }
}

/// Predicate plus the resources it declares
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub when: FactPredicate,
    #[serde(default, rename = "resource")]
    pub resources: Vec<ResourceTemplate>,
}

impl Rule {
    pub fn always() -> Self {
        Self::default()
    }

    pub fn when(predicate: FactPredicate) -> Self {
        Self {
            when: predicate,
            resources: Vec::new(),
        }
    }

    pub fn declare(mut self, template: ResourceTemplate) -> Self {
        self.resources.push(template);
        self
    }
}

/// Named, declarative bundle of desired resource states
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default, rename = "rule")]
    pub rules: Vec<Rule>,
}

impl Profile {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            includes: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn include(mut self, name: &str) -> Self {
        self.includes.push(name.to_string());
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Kernel crash-dump profile: kdump is installed but kept disabled
    pub fn builtin_kdump() -> Self {
        Self::new("kdump")
            .describe("Keep the kernel crash-dump service stopped and disabled")
            .rule(
                Rule::always().declare(
                    ResourceTemplate::new(ResourceId::service("kdump"))
                        .with("ensure", "stopped")
                        .with("enable", "false"),
                ),
            )
    }
}

/// Attribute values may be written as strings, booleans or integers
fn scalar_attributes<'de, D>(deserializer: D) -> Result<Attributes, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Bool(bool),
        Int(i64),
        Str(String),
    }

    let raw = BTreeMap::<String, Scalar>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(k, v)| {
            let value = match v {
                Scalar::Bool(b) => b.to_string(),
                Scalar::Int(i) => i.to_string(),
                Scalar::Str(s) => s,
            };
            (k, value)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redhat() -> FactStore {
        FactStore::from_pairs([("os.family", "RedHat"), ("os.release.major", "7")])
    }

    #[test]
    fn test_predicates() {
        let facts = redhat();
        assert!(FactPredicate::Always.matches(&facts));
        assert!(FactPredicate::equals("os.family", "RedHat").matches(&facts));
        assert!(!FactPredicate::equals("os.family", "Debian").matches(&facts));
        assert!(FactPredicate::one_of("os.release.major", &["7", "8"]).matches(&facts));
        assert!(
            FactPredicate::Absent {
                fact: "os.distro.codename".into()
            }
            .matches(&facts)
        );
        assert!(
            FactPredicate::Not(Box::new(FactPredicate::Present {
                fact: "virtual".into()
            }))
            .matches(&facts)
        );
        assert!(
            FactPredicate::All(vec![
                FactPredicate::equals("os.family", "RedHat"),
                FactPredicate::Any(vec![
                    FactPredicate::equals("os.release.major", "6"),
                    FactPredicate::equals("os.release.major", "7"),
                ]),
            ])
            .matches(&facts)
        );
    }

    #[test]
    fn test_absent_fact_never_equals() {
        let facts = FactStore::default();
        assert!(!FactPredicate::equals("os.family", "RedHat").matches(&facts));
        assert!(!FactPredicate::one_of("os.family", &["RedHat"]).matches(&facts));
    }

    #[test]
    fn test_builtin_kdump() {
        let profile = Profile::builtin_kdump();
        assert_eq!(profile.name, "kdump");
        assert_eq!(profile.rules.len(), 1);
        let template = &profile.rules[0].resources[0];
        assert_eq!(template.id, ResourceId::service("kdump"));
        assert_eq!(template.attributes["ensure"], "stopped");
        assert_eq!(template.attributes["enable"], "false");
    }

    #[test]
    fn test_template_accepts_scalar_attributes() {
        let template: ResourceTemplate = toml::from_str(
            "id = \"Service[kdump]\"\nattributes = { ensure = \"stopped\", enable = false }\n",
        )
        .unwrap();
        assert_eq!(template.attributes["enable"], "false");
        assert!(template.requires.is_empty());
    }

    #[test]
    fn test_rule_predicate_from_toml() {
        let rule: Rule = toml::from_str(
            "when = { one_of = { fact = \"os.family\", values = [\"RedHat\", \"Suse\"] } }\n",
        )
        .unwrap();
        assert_eq!(
            rule.when,
            FactPredicate::one_of("os.family", &["RedHat", "Suse"])
        );

        let rule: Rule = toml::from_str("when = \"always\"\n").unwrap();
        assert_eq!(rule.when, FactPredicate::Always);
    }
}
