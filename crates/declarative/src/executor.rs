//! Execution engine - reconciles a catalog against live state and applies diffs
//!
//! `reconcile` only reads. `apply` walks the catalog's dependency layers,
//! converging every resource of a layer in parallel before starting the
//! next one. A resource whose dependency did not converge is skipped.

use crate::context::{CancellationToken, NoProgress, ProgressCallback};
use crate::diff::{self, Diff};
use crate::provider::{Provider, Session, StateReader};
use crate::resource::{Catalog, Resource};
use crate::retry::RetryConfig;
use crate::types::{ApplyResult, Attributes, ExecuteSummary, ResourceId, ResourcePhase};
use rayon::prelude::*;
use serde::Serialize;
use std::time::Duration;

/// Options shared by reconcile, apply and verify
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Number of parallel provider calls
    pub jobs: usize,
    /// Upper bound on a single provider call
    pub timeout: Duration,
    pub retry: RetryConfig,
    /// Report what would change without calling `set_state`
    pub dry_run: bool,
    pub cancel: CancellationToken,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            jobs: 4,
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            dry_run: false,
            cancel: CancellationToken::new(),
        }
    }
}

/// Live-state check of one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceCheck {
    pub id: ResourceId,
    /// `Matched`, `Diffed` or `Failed`
    pub phase: ResourcePhase,
    pub diffs: Vec<Diff>,
    /// Why the live state could not be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of comparing a catalog with live state
#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    catalog: Catalog,
    /// One check per catalog resource, in catalog order
    checks: Vec<ResourceCheck>,
}

impl Reconciliation {
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn checks(&self) -> &[ResourceCheck] {
        &self.checks
    }

    /// All diffs, in catalog order
    pub fn diffs(&self) -> Vec<Diff> {
        self.checks
            .iter()
            .flat_map(|c| c.diffs.iter().cloned())
            .collect()
    }

    /// Resources whose state could not be read
    pub fn failures(&self) -> impl Iterator<Item = &ResourceCheck> {
        self.checks
            .iter()
            .filter(|c| c.phase == ResourcePhase::Failed)
    }

    /// Check if live state already matches the catalog everywhere
    pub fn is_converged(&self) -> bool {
        self.checks
            .iter()
            .all(|c| c.phase == ResourcePhase::Matched)
    }
}

/// Final result of applying one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceOutcome {
    pub id: ResourceId,
    pub result: ApplyResult,
}

impl ResourceOutcome {
    pub fn phase(&self) -> ResourcePhase {
        self.result.phase()
    }
}

/// Summarize outcomes by result kind
pub fn summarize(outcomes: &[ResourceOutcome]) -> ExecuteSummary {
    let mut summary = ExecuteSummary::default();
    for outcome in outcomes {
        summary.add_result(&outcome.result);
    }
    summary
}

/// Worker pool for provider calls
///
/// Falls back to running on the calling thread when only one job is
/// requested or the pool cannot be built.
pub(crate) struct Workers {
    pool: Option<rayon::ThreadPool>,
}

impl Workers {
    pub(crate) fn new(jobs: usize) -> Self {
        if jobs <= 1 {
            return Self { pool: None };
        }
        match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => Self { pool: Some(pool) },
            Err(e) => {
                log::warn!("Failed to create thread pool, running sequentially: {e}");
                Self { pool: None }
            }
        }
    }

    /// Map over items, keeping input order in the output
    pub(crate) fn map<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        match &self.pool {
            Some(pool) if items.len() > 1 => pool.install(|| items.par_iter().map(&f).collect()),
            _ => items.iter().map(f).collect(),
        }
    }
}

/// Query live state for every catalog resource and diff it
///
/// Never calls `set_state`. A resource whose state cannot be read ends
/// up `Failed` without affecting the others.
pub fn reconcile<P>(catalog: &Catalog, provider: &P, options: &ReconcileOptions) -> Reconciliation
where
    P: StateReader + ?Sized,
{
    let session = Session::new(provider, options.timeout, options.retry.clone());
    let workers = Workers::new(options.jobs);

    let checks = workers.map(catalog.resources(), |resource| check(resource, &session));

    let diffed = checks
        .iter()
        .filter(|c| c.phase == ResourcePhase::Diffed)
        .count();
    log::info!(
        "Reconciled {} resources: {} need changes",
        checks.len(),
        diffed
    );

    Reconciliation {
        catalog: catalog.clone(),
        checks,
    }
}

fn check<P: StateReader + ?Sized>(resource: &Resource, session: &Session<'_, P>) -> ResourceCheck {
    match session.get_state(&resource.id) {
        Ok(live) => {
            let diffs = diff::compute(resource, &live);
            let phase = if diffs.is_empty() {
                ResourcePhase::Matched
            } else {
                ResourcePhase::Diffed
            };
            log::debug!("{}: {:?} ({} diffs)", resource.id, phase, diffs.len());
            ResourceCheck {
                id: resource.id.clone(),
                phase,
                diffs,
                error: None,
            }
        }
        Err(e) => {
            log::warn!("Failed to query {}: {e}", resource.id);
            ResourceCheck {
                id: resource.id.clone(),
                phase: ResourcePhase::Failed,
                diffs: Vec::new(),
                error: Some(e.to_string()),
            }
        }
    }
}

/// Apply a reconciliation without progress reporting
pub fn apply<P>(
    reconciliation: &Reconciliation,
    provider: &P,
    options: &ReconcileOptions,
) -> Vec<ResourceOutcome>
where
    P: Provider + ?Sized,
{
    apply_with_progress(reconciliation, provider, options, &mut NoProgress)
}

/// Converge every diffed resource, layer by layer
///
/// Returns one outcome per catalog resource, in catalog order. Failures
/// are isolated to the resource and its dependents.
pub fn apply_with_progress<P, C>(
    reconciliation: &Reconciliation,
    provider: &P,
    options: &ReconcileOptions,
    progress: &mut C,
) -> Vec<ResourceOutcome>
where
    P: Provider + ?Sized,
    C: ProgressCallback + ?Sized,
{
    let catalog = &reconciliation.catalog;
    let resources = catalog.resources();
    let checks = &reconciliation.checks;
    let session = Session::new(provider, options.timeout, options.retry.clone());
    let workers = Workers::new(options.jobs);
    let mut results: Vec<Option<ApplyResult>> = vec![None; resources.len()];

    for (number, layer) in catalog.layers().iter().enumerate() {
        progress.on_layer_start(number, layer.len());

        let mut pending = Vec::new();
        for &i in layer {
            match precheck(&resources[i], &checks[i], catalog, &results, options) {
                Some(result) => results[i] = Some(result),
                None => pending.push(i),
            }
        }

        let applied = workers.map(&pending, |&i| {
            if options.cancel.is_cancelled() {
                return ApplyResult::Skipped {
                    reason: "cancelled".to_string(),
                };
            }
            converge(&resources[i], &checks[i].diffs, &session)
        });
        for (i, result) in pending.into_iter().zip(applied) {
            results[i] = Some(result);
        }

        for &i in layer {
            if let Some(result) = &results[i] {
                progress.on_resource_complete(&resources[i].id, result);
            }
        }
        progress.on_layer_complete(number);
    }

    resources
        .iter()
        .zip(results)
        .map(|(resource, result)| ResourceOutcome {
            id: resource.id.clone(),
            result: result.unwrap_or_else(|| ApplyResult::Skipped {
                reason: "not scheduled".to_string(),
            }),
        })
        .collect()
}

/// Decide a resource's result without calling the provider, if possible
fn precheck(
    resource: &Resource,
    check: &ResourceCheck,
    catalog: &Catalog,
    results: &[Option<ApplyResult>],
    options: &ReconcileOptions,
) -> Option<ApplyResult> {
    match check.phase {
        ResourcePhase::Matched => return Some(ApplyResult::NoChange),
        ResourcePhase::Failed => {
            return Some(ApplyResult::Failed {
                error: check
                    .error
                    .clone()
                    .unwrap_or_else(|| "state unavailable".to_string()),
            });
        }
        _ => {}
    }

    if options.dry_run {
        return Some(ApplyResult::Skipped {
            reason: "dry run".to_string(),
        });
    }
    if options.cancel.is_cancelled() {
        return Some(ApplyResult::Skipped {
            reason: "cancelled".to_string(),
        });
    }

    let blocked = resource.requires.iter().find(|required| {
        catalog
            .position(required)
            .and_then(|j| results[j].as_ref())
            .is_none_or(|r| matches!(r, ApplyResult::Failed { .. } | ApplyResult::Skipped { .. }))
    });
    if let Some(required) = blocked {
        return Some(ApplyResult::Skipped {
            reason: format!("dependency {required} did not converge"),
        });
    }
    None
}

fn converge<P: Provider + ?Sized>(
    resource: &Resource,
    diffs: &[Diff],
    session: &Session<'_, P>,
) -> ApplyResult {
    let changes: Attributes = diffs
        .iter()
        .map(|d| (d.attribute.clone(), d.desired.clone()))
        .collect();

    match session.set_state(&resource.id, &changes) {
        Ok(()) => {
            log::info!("Applied {}", resource.description());
            ApplyResult::Applied {
                changed: changes.into_keys().collect(),
            }
        }
        Err(e) => {
            log::error!("Failed to apply {}: {e}", resource.id);
            ApplyResult::Failed {
                error: e.to_string(),
            }
        }
    }
}
