//! Resource provider traits and the session wrapper the engine calls through
//!
//! Providers are the external adapters that read and change real system
//! state. Every call carries a timeout; a provider that cannot answer in
//! time must return [`Error::ProviderTimeout`] rather than block.

use crate::error::{Error, Result};
use crate::retry::{RetryConfig, with_retry};
use crate::types::{Attributes, LiveState, ResourceId};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Read side of a provider
pub trait StateReader: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str {
        "provider"
    }

    /// Snapshot the current attributes of a resource
    fn get_state(&self, id: &ResourceId, timeout: Duration) -> Result<LiveState>;

    /// Whether concurrent calls for distinct resources are safe
    ///
    /// When this returns false the engine serializes every call through a
    /// per-provider lock.
    fn is_thread_safe(&self) -> bool {
        true
    }
}

/// Provider that can also change system state
pub trait Provider: StateReader {
    /// Converge the given attributes of a resource
    fn set_state(&self, id: &ResourceId, attributes: &Attributes, timeout: Duration) -> Result<()>;
}

/// Call locks for providers that are not thread-safe, keyed by address
///
/// Every session over the same provider shares one entry, so concurrent
/// engine operations are serialized too. The last session to drop removes it.
static PROVIDER_LOCKS: LazyLock<Mutex<HashMap<usize, Arc<Mutex<()>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn provider_locks() -> MutexGuard<'static, HashMap<usize, Arc<Mutex<()>>>> {
    PROVIDER_LOCKS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Provider access shared by the engine's workers
///
/// Applies the timeout to every call, retries retryable failures, and
/// holds the per-provider lock for providers that are not thread-safe.
pub struct Session<'a, P: ?Sized> {
    provider: &'a P,
    lock: Option<(usize, Arc<Mutex<()>>)>,
    timeout: Duration,
    retry: RetryConfig,
}

impl<'a, P: StateReader + ?Sized> Session<'a, P> {
    pub fn new(provider: &'a P, timeout: Duration, retry: RetryConfig) -> Self {
        let lock = (!provider.is_thread_safe()).then(|| {
            log::debug!("{} is not thread-safe; serializing calls", provider.name());
            let key = std::ptr::from_ref(provider).cast::<()>().addr();
            let lock = Arc::clone(provider_locks().entry(key).or_default());
            (key, lock)
        });
        Self {
            provider,
            lock,
            timeout,
            retry,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn guard(&self) -> Option<MutexGuard<'_, ()>> {
        self.lock
            .as_ref()
            .map(|(_, m)| m.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Query a resource; answers that arrive after the timeout are discarded
    pub fn get_state(&self, id: &ResourceId) -> Result<LiveState> {
        let label = format!("{} get_state {id}", self.provider.name());
        with_retry(&self.retry, &label, || {
            let _guard = self.guard();
            let started = Instant::now();
            let state = self.provider.get_state(id, self.timeout)?;
            if started.elapsed() > self.timeout {
                return Err(Error::ProviderTimeout {
                    resource: id.to_string(),
                    timeout: self.timeout,
                });
            }
            log::trace!("{label}: {:?}", state.attributes);
            Ok(state)
        })
    }
}

impl<P: Provider + ?Sized> Session<'_, P> {
    pub fn set_state(&self, id: &ResourceId, attributes: &Attributes) -> Result<()> {
        let label = format!("{} set_state {id}", self.provider.name());
        with_retry(&self.retry, &label, || {
            let _guard = self.guard();
            self.provider.set_state(id, attributes, self.timeout)
        })
    }
}

impl<P: ?Sized> Drop for Session<'_, P> {
    fn drop(&mut self) {
        let Some((key, lock)) = self.lock.take() else {
            return;
        };
        let mut locks = provider_locks();
        // One reference in the map, one held here
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryProvider;
    use crate::retry;

    #[test]
    fn test_session_reads_state() {
        let provider = MemoryProvider::new().with_state(
            ResourceId::service("kdump"),
            &[("ensure", "running")],
        );
        let session = Session::new(&provider, Duration::from_secs(1), RetryConfig::no_retry());

        let state = session.get_state(&ResourceId::service("kdump")).unwrap();
        assert_eq!(state.get("ensure"), Some("running"));
    }

    #[test]
    fn test_session_retries_timeouts() {
        let id = ResourceId::service("kdump");
        let provider = MemoryProvider::new()
            .with_state(id.clone(), &[("ensure", "running")])
            .timing_out(id.clone(), 2);
        let session = Session::new(&provider, Duration::from_secs(1), retry::fast(3));

        assert!(session.get_state(&id).is_ok());
        assert_eq!(provider.reads(), 3);
    }

    #[test]
    fn test_slow_answer_is_a_timeout() {
        let id = ResourceId::service("kdump");
        let provider = MemoryProvider::new().with_latency(Duration::from_millis(50));
        let session = Session::new(&provider, Duration::from_millis(5), RetryConfig::no_retry());

        let err = session.get_state(&id).unwrap_err();
        assert!(matches!(err, Error::ProviderTimeout { .. }));
    }

    #[test]
    fn test_set_state_errors_are_not_retried() {
        let id = ResourceId::service("kdump");
        let provider = MemoryProvider::new().failing_writes(id.clone());
        let session = Session::new(&provider, Duration::from_secs(1), retry::fast(3));

        let attrs = Attributes::from([("ensure".to_string(), "stopped".to_string())]);
        assert!(matches!(
            session.set_state(&id, &attrs),
            Err(Error::ProviderState { .. })
        ));
        assert_eq!(provider.writes(), 1);
    }

    #[test]
    fn test_sessions_share_the_provider_lock() {
        let provider = MemoryProvider::new()
            .with_latency(Duration::from_millis(20))
            .not_thread_safe();
        let ids: Vec<_> = ["a", "b", "c", "d"].map(ResourceId::service).into();

        std::thread::scope(|scope| {
            for _ in 0..2 {
                scope.spawn(|| {
                    let session =
                        Session::new(&provider, Duration::from_secs(1), RetryConfig::no_retry());
                    for id in &ids {
                        session.get_state(id).unwrap();
                    }
                });
            }
        });

        assert_eq!(provider.reads(), 8);
        assert_eq!(provider.max_concurrency(), 1);
    }

    #[test]
    fn test_lock_is_released_with_the_last_session() {
        let provider = MemoryProvider::new().not_thread_safe();
        let key = std::ptr::from_ref(&provider).cast::<()>().addr();

        let first = Session::new(&provider, Duration::from_secs(1), RetryConfig::no_retry());
        let second = Session::new(&provider, Duration::from_secs(1), RetryConfig::no_retry());
        drop(first);
        assert!(provider_locks().contains_key(&key));
        drop(second);
        assert!(!provider_locks().contains_key(&key));
    }
}
