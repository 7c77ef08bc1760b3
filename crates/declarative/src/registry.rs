//! Profile registry
//!
//! The registry maps profile names to definitions. It is assembled once
//! through [`RegistryBuilder`] and is immutable afterwards; the compiler
//! receives it explicitly.

use crate::error::{Error, Result};
use crate::profile::Profile;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Immutable map of profile names to definitions
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, Profile>,
}

impl ProfileRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Registry holding only the built-in profiles
    pub fn builtin() -> Self {
        Self::builder().with_builtins().build()
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Builder for [`ProfileRegistry`]
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    profiles: BTreeMap<String, Profile>,
}

#[derive(Deserialize)]
struct ProfileFile {
    #[serde(default, rename = "profile")]
    profiles: Vec<Profile>,
}

impl RegistryBuilder {
    /// Add the profiles shipped with the crate
    pub fn with_builtins(mut self) -> Self {
        let kdump = Profile::builtin_kdump();
        self.profiles.insert(kdump.name.clone(), kdump);
        self
    }

    /// Register a profile; names must be unique
    pub fn register(mut self, profile: Profile) -> Result<Self> {
        if self.profiles.contains_key(&profile.name) {
            return Err(Error::DuplicateProfile { name: profile.name });
        }
        log::debug!("Registered profile {}", profile.name);
        self.profiles.insert(profile.name.clone(), profile);
        Ok(self)
    }

    /// Register every `[[profile]]` table in a TOML document
    pub fn register_toml(self, source: &str) -> Result<Self> {
        self.register_toml_from(source, None)
    }

    fn register_toml_from(mut self, source: &str, path: Option<&Path>) -> Result<Self> {
        let file: ProfileFile = toml::from_str(source).map_err(|e| Error::ProfileDefinition {
            path: path.map(Path::to_path_buf),
            message: e.to_string(),
        })?;

        for profile in file.profiles {
            self = self.register(profile)?;
        }
        Ok(self)
    }

    /// Register every `*.toml` file in a directory, in file name order
    pub fn load_dir(mut self, dir: &Path) -> Result<Self> {
        let mut paths: Vec<_> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();

        for path in paths {
            let content = fs::read_to_string(&path)?;
            log::debug!("Loading profiles from {}", path.display());
            self = self.register_toml_from(&content, Some(&path))?;
        }
        Ok(self)
    }

    pub fn build(self) -> ProfileRegistry {
        ProfileRegistry {
            profiles: self.profiles,
        }
    }
}
