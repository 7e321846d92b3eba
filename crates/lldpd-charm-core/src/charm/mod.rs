//! Hook dispatcher
//!
//! [`LldpdCharm`] handles exactly one lifecycle hook per call:
//!
//! ```text
//!  hook ──▶ re-deliver deferred ──▶ LifecycleGate ──▶ Proceed ──▶ handler
//!                                        │
//!                                        └──▶ Defer ──▶ StateStore queue
//! ```
//!
//! | hook | handler |
//! |------|---------|
//! | `install`, `upgrade-charm` | update package index, install packages, mark ready |
//! | `config-changed` | run the [`Reconciler`] |
//! | `nrpe-external-master-relation-*` | monitoring registration (no checks are managed) |
//!
//! Deferred hooks are re-delivered oldest first at the start of every
//! dispatch, before the incoming hook, and go through the same gate.
//! Progress is reported as [`CharmEvent`]s on a bounded channel.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::config::{CharmConfig, CharmSettings, HostIdentity};
use crate::error::Result;
use crate::reconciler::{ReconcileReport, Reconciler};
use crate::traits::{
    CommandRunner, DeferredHook, DeviceLister, PackageManager, ServiceManager, StateStore,
};

pub use crate::lifecycle::Hook;
use crate::lifecycle::{Admission, LifecycleGate};

/// Default capacity of the event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Workload status reported by the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitStatus {
    /// Work in progress
    Maintenance(String),
    /// Daemon configured and running
    Active(String),
}

/// Events emitted by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharmEvent {
    /// Workload status changed
    StatusChanged(UnitStatus),

    /// Hook queued until the operator is ready
    HookDeferred {
        hook: Hook,
        deliveries: u32,
    },

    /// Hook handler completed
    HookHandled {
        hook: Hook,
        redelivered: bool,
    },

    /// Packages installed and readiness set
    Installed {
        packages: Vec<String>,
    },

    /// Configuration applied
    Reconciled(ReconcileReport),
}

/// Result of one dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The incoming hook ran
    Handled,
    /// The incoming hook was queued for re-delivery
    Deferred,
}

/// Host-facing capabilities the dispatcher drives
pub struct HostCapabilities {
    /// Network interface enumeration
    pub devices: Box<dyn DeviceLister>,
    /// External command execution
    pub runner: Box<dyn CommandRunner>,
    /// Package installation
    pub packages: Box<dyn PackageManager>,
    /// Service reload/restart
    pub services: Box<dyn ServiceManager>,
}

/// The lldpd operator
pub struct LldpdCharm {
    settings: CharmSettings,
    config: CharmConfig,
    identity: HostIdentity,
    host: HostCapabilities,
    state_store: Box<dyn StateStore>,
    reconciler: Reconciler,
    event_tx: mpsc::Sender<CharmEvent>,
}

impl LldpdCharm {
    /// Create a dispatcher
    ///
    /// # Returns
    ///
    /// A tuple of (charm, event_receiver) where event_receiver yields charm events
    pub fn new(
        settings: CharmSettings,
        config: CharmConfig,
        identity: HostIdentity,
        host: HostCapabilities,
        state_store: Box<dyn StateStore>,
    ) -> Result<(Self, mpsc::Receiver<CharmEvent>)> {
        settings.validate()?;

        let (tx, rx) = mpsc::channel(DEFAULT_EVENT_CAPACITY);
        let reconciler = Reconciler::new(settings.clone());

        let charm = Self {
            settings,
            config,
            identity,
            host,
            state_store,
            reconciler,
            event_tx: tx,
        };

        Ok((charm, rx))
    }

    /// Settings in use
    pub fn settings(&self) -> &CharmSettings {
        &self.settings
    }

    /// Handle one hook
    ///
    /// # Returns
    ///
    /// - `Ok(Handled)`: The hook ran to completion
    /// - `Ok(Deferred)`: The operator is not ready; the hook is queued
    /// - `Err(Error)`: A handler failed; the hook counts as failed
    pub async fn dispatch(&self, hook: Hook) -> Result<DispatchOutcome> {
        info!("Running {} hook", hook);

        let mut gate = LifecycleGate::from_ready(self.state_store.is_ready().await?);
        self.redeliver_deferred(&mut gate).await?;

        let outcome = match gate.admit(hook) {
            Admission::Defer => {
                self.defer(hook).await?;
                DispatchOutcome::Deferred
            }
            Admission::Proceed => {
                self.handle(hook, &mut gate).await?;
                self.emit_event(CharmEvent::HookHandled {
                    hook,
                    redelivered: false,
                });
                DispatchOutcome::Handled
            }
        };

        self.state_store.flush().await?;
        Ok(outcome)
    }

    async fn defer(&self, hook: Hook) -> Result<()> {
        let state = self.state_store.state().await?;
        if let Some(queued) = state.deferred.iter().find(|d| d.hook == hook) {
            info!("{} already deferred, waiting for install", hook);
            self.emit_event(CharmEvent::HookDeferred {
                hook,
                deliveries: queued.deliveries,
            });
            return Ok(());
        }

        info!("Not ready yet, deferring {}", hook);
        self.state_store.push_deferred(DeferredHook::new(hook)).await?;
        self.emit_event(CharmEvent::HookDeferred {
            hook,
            deliveries: 0,
        });
        Ok(())
    }

    async fn redeliver_deferred(&self, gate: &mut LifecycleGate) -> Result<()> {
        let queue = self.state_store.state().await?.deferred;
        if queue.is_empty() {
            return Ok(());
        }
        debug!("Re-delivering {} deferred hook(s)", queue.len());

        let mut waiting = Vec::with_capacity(queue.len());
        let mut pending = queue.into_iter();
        while let Some(entry) = pending.next() {
            let entry = entry.redelivered();
            match gate.admit(entry.hook) {
                Admission::Defer => {
                    debug!("{} still deferred ({} deliveries)", entry.hook, entry.deliveries);
                    self.emit_event(CharmEvent::HookDeferred {
                        hook: entry.hook,
                        deliveries: entry.deliveries,
                    });
                    waiting.push(entry);
                }
                Admission::Proceed => {
                    if let Err(e) = self.handle(entry.hook, gate).await {
                        waiting.push(entry);
                        waiting.extend(pending);
                        self.state_store.set_deferred(waiting).await?;
                        return Err(e);
                    }
                    self.emit_event(CharmEvent::HookHandled {
                        hook: entry.hook,
                        redelivered: true,
                    });
                }
            }
        }

        self.state_store.set_deferred(waiting).await
    }

    async fn handle(&self, hook: Hook, gate: &mut LifecycleGate) -> Result<()> {
        match hook {
            Hook::Install | Hook::UpgradeCharm => {
                self.install().await?;
                gate.install_succeeded();
                self.state_store.set_ready(true).await
            }
            Hook::ConfigChanged => self.configure().await.map(|_| ()),
            Hook::NrpeExternalMasterRelationChanged | Hook::NrpeExternalMasterRelationJoined => {
                self.setup_nrpe();
                Ok(())
            }
        }
    }

    /// Refresh the package index and install the daemon
    pub async fn install(&self) -> Result<()> {
        info!("Installing lldpd.");
        self.set_status(UnitStatus::Maintenance("Installing packages".to_string()));

        self.host.packages.update().await?;
        self.host.packages.install(&self.settings.packages).await?;

        self.emit_event(CharmEvent::Installed {
            packages: self.settings.packages.clone(),
        });
        Ok(())
    }

    /// Apply the configuration snapshot
    pub async fn configure(&self) -> Result<ReconcileReport> {
        info!("Running config-changed");
        self.set_status(UnitStatus::Maintenance("Updating configuration".to_string()));

        let report = self
            .reconciler
            .reconcile(
                &self.config,
                &self.identity,
                self.host.devices.as_ref(),
                self.host.runner.as_ref(),
                self.host.services.as_ref(),
            )
            .await?;

        self.emit_event(CharmEvent::Reconciled(report.clone()));
        self.set_status(UnitStatus::Active("ready".to_string()));
        Ok(report)
    }

    fn setup_nrpe(&self) {
        info!("Monitoring relation changed; no NRPE checks are managed by this charm");
    }

    fn set_status(&self, status: UnitStatus) {
        debug!("Status: {:?}", status);
        self.emit_event(CharmEvent::StatusChanged(status));
    }

    fn emit_event(&self, event: CharmEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Event receiver dropped, discarding event");
            }
        }
    }
}
