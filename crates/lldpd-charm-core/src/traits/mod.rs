//! Core traits for the lldpd operator
//!
//! This module defines the capability interfaces the operator consumes.
//!
//! - [`DeviceLister`]: Enumerate network interfaces and their driver binding
//! - [`CommandRunner`]: Run external commands and report exit code and output
//! - [`PackageManager`]: Refresh the package index and install packages
//! - [`ServiceManager`]: Reload or restart a system service
//! - [`StateStore`]: Persist readiness and deferred hooks across invocations

pub mod device_lister;
pub mod command_runner;
pub mod host;
pub mod state_store;

pub use device_lister::{DeviceLister, NicRecord};
pub use command_runner::{CommandRunner, ExecResult, format_command};
pub use host::{PackageManager, ServiceManager};
pub use state_store::{CharmState, DeferredHook, StateStore};
