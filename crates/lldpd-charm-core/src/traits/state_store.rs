// # State Store Trait
//
// Defines the interface for the operator's persisted state.
//
// ## Purpose
//
// Each hook runs in a fresh process, so anything that must outlive a hook
// goes through the state store:
// - Whether the install step has completed (readiness)
// - Hooks that arrived too early and are waiting to be re-delivered
//
// ## Implementations
//
// - File-based: JSON file with atomic writes and a backup
// - In-memory: tests and dry runs

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::lifecycle::Hook;

/// A hook waiting for the operator to become ready
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DeferredHook {
    /// The deferred hook
    pub hook: Hook,
    /// When the hook was first deferred
    pub first_deferred: DateTime<Utc>,
    /// How many times the hook has been re-delivered
    pub deliveries: u32,
}

impl DeferredHook {
    /// Defer `hook` now
    pub fn new(hook: Hook) -> Self {
        Self {
            hook,
            first_deferred: Utc::now(),
            deliveries: 0,
        }
    }

    /// The same entry after one more delivery attempt
    pub fn redelivered(mut self) -> Self {
        self.deliveries = self.deliveries.saturating_add(1);
        self
    }
}

/// Snapshot of everything the state store holds
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CharmState {
    /// Install has completed
    pub ready: bool,
    /// When readiness was last set
    #[serde(default)]
    pub ready_since: Option<DateTime<Utc>>,
    /// Hooks waiting for readiness, oldest first
    #[serde(default)]
    pub deferred: Vec<DeferredHook>,
}

/// Trait for state store implementations
///
/// Mutating methods must be durable when they return: a hook that defers
/// itself and then crashes must still be re-delivered on the next run.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Check whether install has completed
    async fn is_ready(&self) -> Result<bool, crate::Error>;

    /// Set the readiness flag
    async fn set_ready(&self, ready: bool) -> Result<(), crate::Error>;

    /// Get a copy of the full state
    async fn state(&self) -> Result<CharmState, crate::Error>;

    /// Append a hook to the deferred queue
    async fn push_deferred(&self, deferred: DeferredHook) -> Result<(), crate::Error>;

    /// Replace the deferred queue
    ///
    /// The dispatcher reads the queue, re-delivers it and writes back what is
    /// still waiting, so a crash in between re-delivers rather than drops.
    async fn set_deferred(&self, deferred: Vec<DeferredHook>) -> Result<(), crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}
