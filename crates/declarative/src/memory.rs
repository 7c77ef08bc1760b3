//! In-memory provider
//!
//! Holds live state in a map. Used by the acceptance harness and tests,
//! and as a reference implementation of the provider contract: it honors
//! timeouts, can inject failures, and records how it was called.

use crate::error::{Error, Result};
use crate::provider::{Provider, StateReader};
use crate::types::{Attributes, LiveState, ResourceId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct MemoryProvider {
    states: Mutex<BTreeMap<ResourceId, Attributes>>,
    failing_reads: HashSet<ResourceId>,
    failing_writes: HashSet<ResourceId>,
    /// Remaining reads that time out, per resource
    timeouts: Mutex<HashMap<ResourceId, u32>>,
    latency: Duration,
    not_thread_safe: bool,
    reads: AtomicUsize,
    writes: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the live state of a resource
    pub fn with_state(self, id: ResourceId, attributes: &[(&str, &str)]) -> Self {
        locked(&self.states).insert(
            id,
            attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    /// Every `get_state` for this resource fails
    pub fn failing_reads(mut self, id: ResourceId) -> Self {
        self.failing_reads.insert(id);
        self
    }

    /// Every `set_state` for this resource fails
    pub fn failing_writes(mut self, id: ResourceId) -> Self {
        self.failing_writes.insert(id);
        self
    }

    /// The next `times` reads of this resource time out
    pub fn timing_out(self, id: ResourceId, times: u32) -> Self {
        locked(&self.timeouts).insert(id, times);
        self
    }

    /// Delay every call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Declare that concurrent calls are unsafe
    pub fn not_thread_safe(mut self) -> Self {
        self.not_thread_safe = true;
        self
    }

    /// Current attributes of a resource
    pub fn snapshot(&self, id: &ResourceId) -> Option<Attributes> {
        locked(&self.states).get(id).cloned()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed running at the same time
    pub fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Track concurrency and simulate latency; fails once the timeout elapses
    fn enter(&self, id: &ResourceId, timeout: Duration) -> Result<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = if self.latency.is_zero() {
            Ok(())
        } else if self.latency > timeout {
            thread::sleep(timeout);
            Err(Error::ProviderTimeout {
                resource: id.to_string(),
                timeout,
            })
        } else {
            thread::sleep(self.latency);
            Ok(())
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl StateReader for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn get_state(&self, id: &ResourceId, timeout: Duration) -> Result<LiveState> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.enter(id, timeout)?;

        if let Some(remaining) = locked(&self.timeouts).get_mut(id)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(Error::ProviderTimeout {
                resource: id.to_string(),
                timeout,
            });
        }

        if self.failing_reads.contains(id) {
            return Err(Error::ProviderState {
                resource: id.to_string(),
                message: "injected read failure".to_string(),
            });
        }

        Ok(LiveState::new(
            locked(&self.states).get(id).cloned().unwrap_or_default(),
        ))
    }

    fn is_thread_safe(&self) -> bool {
        !self.not_thread_safe
    }
}

impl Provider for MemoryProvider {
    fn set_state(&self, id: &ResourceId, attributes: &Attributes, timeout: Duration) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.enter(id, timeout)?;

        if self.failing_writes.contains(id) {
            return Err(Error::ProviderState {
                resource: id.to_string(),
                message: "injected write failure".to_string(),
            });
        }

        locked(&self.states)
            .entry(id.clone())
            .or_default()
            .extend(attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }
}
