//! Resource and catalog model
//!
//! A [`Resource`] is one desired system entity. A [`Catalog`] is the
//! ordered, immutable set of resources compiled from a profile for one
//! node. Catalogs are only produced by the compiler.

use crate::error::Result;
use crate::planner;
use crate::types::{Attributes, ResourceId};
use serde::{Deserialize, Serialize};

/// A desired resource with its attributes and dependencies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub attributes: Attributes,
    /// Resources that must converge before this one
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<ResourceId>,
    /// Profile that first declared this resource
    pub declared_by: String,
}

impl Resource {
    pub fn new(id: ResourceId, declared_by: impl Into<String>) -> Self {
        Self {
            id,
            attributes: Attributes::new(),
            requires: Vec::new(),
            declared_by: declared_by.into(),
        }
    }

    pub fn with(mut self, attribute: &str, value: &str) -> Self {
        self.attributes
            .insert(attribute.to_string(), value.to_string());
        self
    }

    pub fn requiring(mut self, id: ResourceId) -> Self {
        if !self.requires.contains(&id) {
            self.requires.push(id);
        }
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Human-readable description
    pub fn description(&self) -> String {
        let attrs: Vec<String> = self
            .attributes
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        format!("{} {}", self.id, attrs.join(" "))
    }
}

/// Compiled, ordered set of resources for one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    profile: String,
    profiles: Vec<String>,
    resources: Vec<Resource>,
    /// Dependency layers as indices into `resources`
    layers: Vec<Vec<usize>>,
}

impl Catalog {
    /// Fails if a dependency is missing or cyclic
    pub(crate) fn new(
        profile: String,
        profiles: Vec<String>,
        resources: Vec<Resource>,
    ) -> Result<Self> {
        let layers = planner::layers(&resources)?;
        Ok(Self {
            profile,
            profiles,
            resources,
            layers,
        })
    }

    pub(crate) fn with_resources(&self, resources: Vec<Resource>) -> Result<Self> {
        Self::new(self.profile.clone(), self.profiles.clone(), resources)
    }

    /// Profile the catalog was compiled from
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Every profile evaluated, in inclusion order
    pub fn profiles(&self) -> &[String] {
        &self.profiles
    }

    pub fn contains_profile(&self, name: &str) -> bool {
        self.profiles.iter().any(|p| p == name)
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Dependency layers; each layer may be applied in parallel
    pub fn layers(&self) -> &[Vec<usize>] {
        &self.layers
    }

    pub fn get(&self, id: &ResourceId) -> Option<&Resource> {
        self.resources.iter().find(|r| &r.id == id)
    }

    pub fn position(&self, id: &ResourceId) -> Option<usize> {
        self.resources.iter().position(|r| &r.id == id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// BLAKE3 digest of the catalog's canonical JSON form
    pub fn digest(&self) -> String {
        // Serializing plain data with string keys cannot fail
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&bytes).to_hex().to_string()
    }
}
