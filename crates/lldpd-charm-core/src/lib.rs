// # lldpd-charm-core
//
// Core library for the lldpd operator charm.
//
// ## Architecture Overview
//
// The operator reacts to lifecycle hooks delivered by the orchestration
// framework and keeps the `lldpd` daemon configured:
// - **DeviceLister**: Trait for enumerating network interfaces and their driver binding
// - **CommandRunner**: Trait for running external commands with a structured result
// - **PackageManager** / **ServiceManager**: Traits for the host collaborators
// - **StateStore**: Trait for the persisted readiness flag and deferred hooks
// - **Reconciler**: Turns a configuration snapshot into `DAEMON_ARGS` and config files
// - **FirmwareLldpDisabler**: Turns off firmware LLDP on i40e NICs
// - **LifecycleGate**: Keeps configuration from running before install completes
// - **LldpdCharm**: Dispatches one hook through the gate to the handlers
//
// ## Design Principles
//
// 1. **Capabilities behind traits**: every host side effect goes through a trait,
//    so the whole hook flow runs against in-memory doubles in tests
// 2. **Library-First**: the binary only reads the environment and calls `dispatch`
// 3. **Deterministic output**: the argument line depends only on config and identity

pub mod traits;
pub mod config;
pub mod error;
pub mod state;
pub mod reconciler;
pub mod nic;
pub mod lifecycle;
pub mod charm;

// Re-export core types for convenience
pub use traits::{CommandRunner, DeviceLister, PackageManager, ServiceManager, StateStore};
pub use config::{CharmConfig, CharmSettings, HostIdentity};
pub use error::{Error, Result};
pub use state::{FileStateStore, MemoryStateStore};
pub use reconciler::{DaemonArgs, ReconcileReport, Reconciler, build_daemon_args};
pub use nic::{FirmwareLldpDisabler, StaticDeviceLister};
pub use lifecycle::{Admission, LifecycleGate, LifecycleState};
pub use charm::{CharmEvent, DispatchOutcome, Hook, HostCapabilities, LldpdCharm, UnitStatus};
