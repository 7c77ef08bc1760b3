//! Execution planner - dependency layering and target selection

use crate::error::{Error, Result};
use crate::resource::{Catalog, Resource};
use crate::types::{ResourceId, ResourceType};
use std::collections::HashMap;

/// Order resources into dependency layers
///
/// Every resource in a layer depends only on resources in earlier layers.
/// Within a layer, resources keep their relative input order. Each layer
/// can be applied in parallel.
pub fn layers(resources: &[Resource]) -> Result<Vec<Vec<usize>>> {
    let index: HashMap<&ResourceId, usize> = resources
        .iter()
        .enumerate()
        .map(|(i, r)| (&r.id, i))
        .collect();

    let mut indegree = vec![0usize; resources.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); resources.len()];

    for (i, resource) in resources.iter().enumerate() {
        for required in &resource.requires {
            let Some(&j) = index.get(required) else {
                return Err(Error::UnresolvedDependency {
                    resource: resource.id.to_string(),
                    requires: required.to_string(),
                });
            };
            indegree[i] += 1;
            dependents[j].push(i);
        }
    }

    let mut layers = Vec::new();
    let mut placed = 0;
    let mut ready: Vec<usize> = (0..resources.len()).filter(|&i| indegree[i] == 0).collect();

    while !ready.is_empty() {
        let mut next = Vec::new();
        for &i in &ready {
            for &d in &dependents[i] {
                indegree[d] -= 1;
                if indegree[d] == 0 {
                    next.push(d);
                }
            }
        }
        next.sort_unstable();
        placed += ready.len();
        layers.push(std::mem::replace(&mut ready, next));
    }

    if placed < resources.len() {
        let resources = resources
            .iter()
            .enumerate()
            .filter(|(i, _)| indegree[*i] > 0)
            .map(|(_, r)| r.id.to_string())
            .collect();
        return Err(Error::DependencyCycle { resources });
    }

    Ok(layers)
}

/// Restrict a catalog to the resources matching a target
///
/// Target format: `type`, `type.name` or `Type[name]`. Dependencies on
/// resources outside the selection are dropped.
pub fn filter_by_target(catalog: &Catalog, target: Option<&str>) -> Result<Catalog> {
    let Some(target) = target else {
        return Ok(catalog.clone());
    };

    let (kind, name) = parse_target(target);
    let selected: Vec<Resource> = catalog
        .resources()
        .iter()
        .filter(|r| matches_filter(r, kind, name.as_deref()))
        .cloned()
        .collect();

    let kept: Vec<ResourceId> = selected.iter().map(|r| r.id.clone()).collect();
    let selected = selected
        .into_iter()
        .map(|mut r| {
            r.requires.retain(|id| kept.contains(id));
            r
        })
        .collect();

    catalog.with_resources(selected)
}

/// Parse a target string like "service.kdump" into (type, name)
fn parse_target(target: &str) -> (Option<ResourceType>, Option<String>) {
    if let Ok(id) = target.parse::<ResourceId>() {
        return (Some(id.kind), Some(id.name));
    }

    let (head, rest) = match target.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (target, None),
    };
    let head = head.strip_suffix('s').unwrap_or(head);

    match head.parse::<ResourceType>() {
        Ok(kind) => (Some(kind), rest.map(ToString::to_string)),
        Err(_) => (None, Some(target.to_string())),
    }
}

/// Check if a resource matches the filter criteria
fn matches_filter(resource: &Resource, kind: Option<ResourceType>, name: Option<&str>) -> bool {
    if let Some(kind) = kind
        && resource.id.kind != kind
    {
        return false;
    }

    if let Some(n) = name
        && resource.id.name != n
    {
        return false;
    }

    true
}
