//! Fact store - immutable key/value attributes describing a node
//!
//! Structured sources are flattened into dotted keys, so a JSON document
//! like `{"os": {"family": "RedHat"}}` yields the fact `os.family`.
//! Missing keys are a normal configuration branch, never an error.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Well-known fact keys
pub mod keys {
    pub const OS_FAMILY: &str = "os.family";
    pub const OS_NAME: &str = "os.name";
    pub const OS_RELEASE_MAJOR: &str = "os.release.major";
    pub const OS_RELEASE_FULL: &str = "os.release.full";
    pub const OS_ARCHITECTURE: &str = "os.architecture";
}

/// Input format of a fact source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactFormat {
    Json,
    Toml,
}

impl FactFormat {
    /// Guess the format from a file extension, defaulting to JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

/// Operating system family, as reported by the `os.family` fact
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OsFamily {
    RedHat,
    Debian,
    Suse,
    Archlinux,
    Darwin,
    Windows,
    Other(String),
}

impl OsFamily {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "redhat" => Self::RedHat,
            "debian" => Self::Debian,
            "suse" => Self::Suse,
            "archlinux" => Self::Archlinux,
            "darwin" => Self::Darwin,
            "windows" => Self::Windows,
            _ => Self::Other(value.to_string()),
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RedHat => write!(f, "RedHat"),
            Self::Debian => write!(f, "Debian"),
            Self::Suse => write!(f, "Suse"),
            Self::Archlinux => write!(f, "Archlinux"),
            Self::Darwin => write!(f, "Darwin"),
            Self::Windows => write!(f, "Windows"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Immutable set of facts for one evaluation context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactStore {
    facts: BTreeMap<String, String>,
}

impl FactStore {
    /// Parse facts from a JSON or TOML document
    pub fn load(source: &str, format: FactFormat) -> Result<Self> {
        let value: serde_json::Value = match format {
            FactFormat::Json => serde_json::from_str(source).map_err(|e| Error::MalformedFacts {
                message: e.to_string(),
            })?,
            FactFormat::Toml => {
                let table: toml::Table = toml::from_str(source).map_err(|e| Error::MalformedFacts {
                    message: e.to_string(),
                })?;
                toml_to_json(toml::Value::Table(table))
            }
        };

        let serde_json::Value::Object(map) = value else {
            return Err(Error::MalformedFacts {
                message: "top level must be an object".to_string(),
            });
        };

        let mut facts = BTreeMap::new();
        for (key, value) in map {
            flatten(&key, value, &mut facts);
        }

        log::debug!("Loaded {} facts", facts.len());
        Ok(Self { facts })
    }

    /// Read facts from a file, picking the format from its extension
    pub fn load_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let content = String::from_utf8(bytes).map_err(|e| Error::MalformedFacts {
            message: format!("{}: {e}", path.display()),
        })?;
        Self::load(&content, FactFormat::from_path(path))
    }

    /// Build a fact store from literal pairs
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            facts: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up a fact. Absent keys return `None`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.facts.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.facts.contains_key(key)
    }

    pub fn os_family(&self) -> Option<OsFamily> {
        self.get(keys::OS_FAMILY).map(OsFamily::parse)
    }

    pub fn os_release(&self) -> Option<&str> {
        self.get(keys::OS_RELEASE_MAJOR)
            .or_else(|| self.get(keys::OS_RELEASE_FULL))
    }

    /// Short label such as `CentOS 7 (RedHat)` for error messages
    pub fn describe_os(&self) -> String {
        let name = self
            .get(keys::OS_NAME)
            .or_else(|| self.get(keys::OS_FAMILY))
            .unwrap_or("unknown OS");
        let mut label = name.to_string();
        if let Some(release) = self.os_release() {
            label.push(' ');
            label.push_str(release);
        }
        if let Some(family) = self.get(keys::OS_FAMILY)
            && family != name
        {
            label.push_str(&format!(" ({family})"));
        }
        label
    }

    /// Iterate facts in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.facts.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

/// Datetimes become their RFC 3339 text
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    use serde_json::Value;

    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, item)| (key, toml_to_json(item)))
                .collect(),
        ),
    }
}

fn flatten(prefix: &str, value: serde_json::Value, out: &mut BTreeMap<String, String>) {
    use serde_json::Value;

    match value {
        Value::Null => {}
        Value::Bool(b) => {
            out.insert(prefix.to_string(), b.to_string());
        }
        Value::Number(n) => {
            out.insert(prefix.to_string(), n.to_string());
        }
        Value::String(s) => {
            out.insert(prefix.to_string(), s);
        }
        Value::Array(items) => {
            for (i, item) in items.into_iter().enumerate() {
                flatten(&format!("{prefix}.{i}"), item, out);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                flatten(&format!("{prefix}.{key}"), item, out);
            }
        }
    }
}
