// # Memory State Store
//
// In-memory implementation of StateStore.
//
// ## Purpose
//
// Holds readiness and deferred hooks for the lifetime of one process.
// Used by tests and by dry runs where nothing should touch the disk.
//
// ## Crash Behavior
//
// - All state is lost when the process exits
// - Every run starts uninitialized, so config-changed defers until install

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::state_store::{CharmState, DeferredHook, StateStore};

/// In-memory state store implementation
///
/// # Example
///
/// ```rust,no_run
/// use lldpd_charm_core::state::MemoryStateStore;
/// use lldpd_charm_core::traits::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStateStore::new();
///     store.set_ready(true).await?;
///     assert!(store.is_ready().await?);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<CharmState>>,
}

impl MemoryStateStore {
    /// Create a new store in the uninitialized state
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that is already ready
    pub fn ready() -> Self {
        Self {
            inner: Arc::new(RwLock::new(CharmState {
                ready: true,
                ready_since: Some(chrono::Utc::now()),
                deferred: Vec::new(),
            })),
        }
    }

    /// Number of hooks waiting in the deferred queue
    pub async fn deferred_len(&self) -> usize {
        self.inner.read().await.deferred.len()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn is_ready(&self) -> Result<bool, Error> {
        Ok(self.inner.read().await.ready)
    }

    async fn set_ready(&self, ready: bool) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.ready = ready;
        guard.ready_since = ready.then(chrono::Utc::now);
        Ok(())
    }

    async fn state(&self) -> Result<CharmState, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn push_deferred(&self, deferred: DeferredHook) -> Result<(), Error> {
        self.inner.write().await.deferred.push(deferred);
        Ok(())
    }

    async fn set_deferred(&self, deferred: Vec<DeferredHook>) -> Result<(), Error> {
        self.inner.write().await.deferred = deferred;
        Ok(())
    }

    async fn flush(&self) -> Result<(), Error> {
        // Nothing to persist
        Ok(())
    }
}
