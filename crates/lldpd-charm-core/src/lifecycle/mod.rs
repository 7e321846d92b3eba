//! Lifecycle gate
//!
//! The operator starts `Uninitialized` and becomes `Ready` once the install
//! step has put the lldpd package on the host. Until then, hooks that would
//! write daemon configuration are deferred instead of executed.
//!
//! ```text
//!                 install / upgrade-charm succeeded
//!  Uninitialized ──────────────────────────────────▶ Ready
//! ```
//!
//! The gate holds no I/O; the dispatcher loads the flag from the state
//! store, asks the gate, and persists whatever the transition returns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle hooks the operator handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Hook {
    /// First deployment on the unit
    Install,
    /// New operator revision deployed
    UpgradeCharm,
    /// Operator configuration changed
    ConfigChanged,
    /// Monitoring relation settings changed
    NrpeExternalMasterRelationChanged,
    /// Monitoring relation established
    NrpeExternalMasterRelationJoined,
}

impl Hook {
    /// Hook name as used by the orchestration framework
    pub fn name(&self) -> &'static str {
        match self {
            Hook::Install => "install",
            Hook::UpgradeCharm => "upgrade-charm",
            Hook::ConfigChanged => "config-changed",
            Hook::NrpeExternalMasterRelationChanged => "nrpe-external-master-relation-changed",
            Hook::NrpeExternalMasterRelationJoined => "nrpe-external-master-relation-joined",
        }
    }

    /// Whether the hook needs the daemon package on the host
    pub fn requires_ready(&self) -> bool {
        matches!(self, Hook::ConfigChanged)
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Hook {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "install" => Ok(Hook::Install),
            "upgrade-charm" => Ok(Hook::UpgradeCharm),
            "config-changed" => Ok(Hook::ConfigChanged),
            "nrpe-external-master-relation-changed" => Ok(Hook::NrpeExternalMasterRelationChanged),
            "nrpe-external-master-relation-joined" => Ok(Hook::NrpeExternalMasterRelationJoined),
            other => Err(crate::Error::config(format!("Unknown hook: {}", other))),
        }
    }
}

/// Lifecycle state of the operator on this unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// The daemon package has not been installed yet
    Uninitialized,
    /// Install completed; configuration may be written
    Ready,
}

impl LifecycleState {
    /// State matching the persisted readiness flag
    pub fn from_ready(ready: bool) -> Self {
        if ready {
            LifecycleState::Ready
        } else {
            LifecycleState::Uninitialized
        }
    }

    /// Value of the persisted readiness flag for this state
    pub fn is_ready(&self) -> bool {
        matches!(self, LifecycleState::Ready)
    }
}

/// Gate decision for one hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Run the hook now
    Proceed,
    /// Queue the hook for re-delivery
    Defer,
}

/// Readiness gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleGate {
    state: LifecycleState,
}

impl LifecycleGate {
    /// Create a gate in `state`
    pub fn new(state: LifecycleState) -> Self {
        Self { state }
    }

    /// Create a gate from the persisted readiness flag
    pub fn from_ready(ready: bool) -> Self {
        Self::new(LifecycleState::from_ready(ready))
    }

    /// Current state
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Decide whether `hook` may run in the current state
    pub fn admit(&self, hook: Hook) -> Admission {
        if hook.requires_ready() && !self.state.is_ready() {
            Admission::Defer
        } else {
            Admission::Proceed
        }
    }

    /// Record a completed install; returns the new state
    ///
    /// Install and upgrade both end in `Ready`, so this is idempotent.
    pub fn install_succeeded(&mut self) -> LifecycleState {
        self.state = LifecycleState::Ready;
        self.state
    }
}

impl Default for LifecycleGate {
    fn default() -> Self {
        Self::new(LifecycleState::Uninitialized)
    }
}
