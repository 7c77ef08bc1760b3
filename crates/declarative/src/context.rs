//! Progress reporting and cancellation
//!
//! These let callers drive the engine without the library depending on a
//! particular terminal UI.

use crate::types::{ApplyResult, ResourceId};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Progress callback for apply operations
///
/// Implement this trait to receive progress updates during execution.
/// Callbacks run on the calling thread, between layers, in catalog order.
pub trait ProgressCallback: Send {
    /// Called when starting to apply a dependency layer
    fn on_layer_start(&mut self, layer: usize, count: usize);

    /// Called once per resource with its final result
    fn on_resource_complete(&mut self, id: &ResourceId, result: &ApplyResult);

    /// Called when a layer completes
    fn on_layer_complete(&mut self, layer: usize);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_layer_start(&mut self, _layer: usize, _count: usize) {}
    fn on_resource_complete(&mut self, _id: &ResourceId, _result: &ApplyResult) {}
    fn on_layer_complete(&mut self, _layer: usize) {}
}

/// Shared flag that stops an apply run from starting new resources
///
/// Resources already being applied finish; the rest are skipped.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
