//! TOML state file provider
//!
//! Stands in for a live system: each `[Type.name]` table holds the
//! current attributes of one resource.
//!
//! ```toml
//! [Service.kdump]
//! ensure = "running"
//! enable = true
//! ```

use anyhow::{Context, Result};
use declarative::{Attributes, LiveState, Provider, ResourceId, ResourceType, StateReader};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// `type -> name -> attribute -> value` as it appears on disk
type Document = BTreeMap<String, BTreeMap<String, BTreeMap<String, toml::Value>>>;

pub struct StateFile {
    path: PathBuf,
    states: Mutex<BTreeMap<ResourceId, Attributes>>,
}

impl StateFile {
    /// Load a state file; a missing file is an empty system
    pub fn load(path: &Path) -> Result<Self> {
        let states = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Could not read {}", path.display()))?;
            parse(&content).with_context(|| format!("Invalid state file: {}", path.display()))?
        } else {
            log::debug!("No state file at {}, starting empty", path.display());
            BTreeMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            states: Mutex::new(states),
        })
    }

    fn states(&self) -> MutexGuard<'_, BTreeMap<ResourceId, Attributes>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write the current state back to disk
    pub fn save(&self) -> Result<()> {
        let mut document: BTreeMap<String, BTreeMap<String, Attributes>> = BTreeMap::new();
        for (id, attributes) in self.states().iter() {
            document
                .entry(id.kind.to_string())
                .or_default()
                .insert(id.name.clone(), attributes.clone());
        }

        let content = toml::to_string_pretty(&document).context("Failed to serialize state")?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, content)
            .with_context(|| format!("Could not write {}", self.path.display()))?;
        log::debug!("Saved state to {}", self.path.display());
        Ok(())
    }
}

fn parse(content: &str) -> Result<BTreeMap<ResourceId, Attributes>> {
    let document: Document = toml::from_str(content)?;
    let mut states = BTreeMap::new();

    for (kind, resources) in document {
        let kind: ResourceType = kind.parse()?;
        for (name, attributes) in resources {
            let attributes = attributes
                .into_iter()
                .map(|(k, v)| {
                    let value = match v {
                        toml::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (k, value)
                })
                .collect();
            states.insert(ResourceId::new(kind, name), attributes);
        }
    }

    Ok(states)
}

impl StateReader for StateFile {
    fn name(&self) -> &str {
        "state-file"
    }

    fn get_state(&self, id: &ResourceId, _timeout: Duration) -> declarative::Result<LiveState> {
        Ok(LiveState::new(
            self.states().get(id).cloned().unwrap_or_default(),
        ))
    }
}

impl Provider for StateFile {
    fn set_state(
        &self,
        id: &ResourceId,
        attributes: &Attributes,
        _timeout: Duration,
    ) -> declarative::Result<()> {
        self.states()
            .entry(id.clone())
            .or_default()
            .extend(attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_state() {
        let states = parse(
            r#"
[Service.kdump]
ensure = "running"
enable = true

[Package.kexec-tools]
ensure = "present"
"#,
        )
        .unwrap();

        let kdump = &states[&ResourceId::service("kdump")];
        assert_eq!(kdump["ensure"], "running");
        assert_eq!(kdump["enable"], "true");
        assert!(states.contains_key(&ResourceId::package("kexec-tools")));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(parse("[Mount.root]\nensure = \"mounted\"\n").is_err());
    }

    #[test]
    fn test_set_state_then_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.toml");
        let state = StateFile::load(&path).unwrap();
        let id = ResourceId::service("kdump");

        let attrs = Attributes::from([("ensure".to_string(), "stopped".to_string())]);
        state.set_state(&id, &attrs, Duration::from_secs(1)).unwrap();
        state.save().unwrap();

        let reloaded = StateFile::load(&path).unwrap();
        let live = reloaded.get_state(&id, Duration::from_secs(1)).unwrap();
        assert_eq!(live.get("ensure"), Some("stopped"));
    }
}
