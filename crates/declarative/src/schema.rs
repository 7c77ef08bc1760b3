//! Attribute domains per resource type
//!
//! Every attribute a catalog carries must come from a fixed, enumerated
//! domain. Validation happens at compile time so an invalid value can
//! never reach a provider.

use crate::error::{Error, Result};
use crate::types::{Attributes, ResourceId, ResourceType};

/// Accepted values of one attribute
#[derive(Debug, Clone, Copy)]
pub struct AttributeDomain {
    pub name: &'static str,
    pub values: &'static [&'static str],
}

const SERVICE: &[AttributeDomain] = &[
    AttributeDomain {
        name: "ensure",
        values: &["running", "stopped"],
    },
    AttributeDomain {
        name: "enable",
        values: &["true", "false"],
    },
];

const PACKAGE: &[AttributeDomain] = &[AttributeDomain {
    name: "ensure",
    values: &["present", "absent", "latest"],
}];

const FILE: &[AttributeDomain] = &[AttributeDomain {
    name: "ensure",
    values: &["file", "directory", "link", "absent"],
}];

/// Attribute domains declared for a resource type
pub fn domains(kind: ResourceType) -> &'static [AttributeDomain] {
    match kind {
        ResourceType::Service => SERVICE,
        ResourceType::Package => PACKAGE,
        ResourceType::File => FILE,
    }
}

/// Look up the domain of a single attribute
pub fn domain(kind: ResourceType, attribute: &str) -> Option<&'static AttributeDomain> {
    domains(kind).iter().find(|d| d.name == attribute)
}

/// Check every attribute of a resource against its type's domains
pub fn validate(id: &ResourceId, attributes: &Attributes) -> Result<()> {
    for (attribute, value) in attributes {
        let Some(domain) = domain(id.kind, attribute) else {
            let known: Vec<&str> = domains(id.kind).iter().map(|d| d.name).collect();
            return Err(Error::InvalidAttribute {
                resource: id.to_string(),
                attribute: attribute.clone(),
                value: value.clone(),
                allowed: format!("attributes {}", known.join(", ")),
            });
        };

        if !domain.values.contains(&value.as_str()) {
            return Err(Error::InvalidAttribute {
                resource: id.to_string(),
                attribute: attribute.clone(),
                value: value.clone(),
                allowed: domain.values.join(", "),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_service_attributes() {
        let id = ResourceId::service("kdump");
        assert!(validate(&id, &attrs(&[("ensure", "stopped"), ("enable", "false")])).is_ok());
        assert!(validate(&id, &attrs(&[("ensure", "running")])).is_ok());
    }

    #[test]
    fn test_out_of_domain_value() {
        let id = ResourceId::service("kdump");
        let err = validate(&id, &attrs(&[("ensure", "paused")])).unwrap_err();
        match err {
            Error::InvalidAttribute {
                attribute, allowed, ..
            } => {
                assert_eq!(attribute, "ensure");
                assert_eq!(allowed, "running, stopped");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_attribute() {
        let id = ResourceId::package("kexec-tools");
        let err = validate(&id, &attrs(&[("enable", "true")])).unwrap_err();
        assert!(matches!(err, Error::InvalidAttribute { .. }));
        assert!(err.to_string().contains("attributes ensure"));
    }

    #[test]
    fn test_every_type_has_ensure() {
        for kind in ResourceType::ALL {
            assert!(domain(kind, "ensure").is_some(), "{kind} lacks ensure");
        }
    }
}
