//! Configuration reconciler
//!
//! Turns one configuration snapshot into the files lldpd reads at start:
//!
//! - `/etc/default/lldpd`: `DAEMON_ARGS="<flags>"`, always rewritten
//! - `/etc/lldpd.conf`: `configure system hostname <name>`, only with `short-name`
//!
//! Flags are emitted in a fixed order:
//!
//! | option | flag |
//! |--------|------|
//! | `systemid-from-interface` | `-C <iface>` |
//! | `interfaces-regex` | `-I <pattern>` |
//! | `enable-snmp` | `-x` |
//! | machine id | `-S juju_machine_id=<id>` |
//!
//! Side effects (firmware LLDP disable, hostname file) run before the
//! defaults file is written, then the service is reloaded.

use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::{CharmConfig, CharmSettings, HostIdentity};
use crate::error::{Error, Result};
use crate::nic::FirmwareLldpDisabler;
use crate::traits::{CommandRunner, DeviceLister, ServiceManager};

/// The flags passed to lldpd through `DAEMON_ARGS`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DaemonArgs {
    flags: Vec<String>,
}

impl DaemonArgs {
    /// Individual flags, in order
    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    /// Check whether no flag is set
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Flags joined by single spaces
    pub fn joined(&self) -> String {
        self.flags.join(" ")
    }

    /// Content of the defaults file
    pub fn render(&self) -> String {
        format!("{}\n", self)
    }

    fn push(&mut self, flag: String) {
        self.flags.push(flag);
    }
}

impl fmt::Display for DaemonArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DAEMON_ARGS=\"{}\"", self.joined())
    }
}

/// Build the lldpd flags for a snapshot
///
/// Pure function of its inputs: the same snapshot and machine id always
/// give the same line.
pub fn build_daemon_args(config: &CharmConfig, machine_id: Option<&str>) -> DaemonArgs {
    let mut args = DaemonArgs::default();

    if let Some(interface) = config.systemid_from_interface() {
        args.push(format!("-C {}", interface));
    }
    if let Some(regex) = config.interfaces_regex() {
        args.push(format!("-I {}", regex));
    }
    if config.enable_snmp {
        args.push("-x".to_string());
    }
    if let Some(id) = machine_id.filter(|id| !id.is_empty()) {
        args.push(format!("-S juju_machine_id={}", id));
    }

    args
}

/// Content of the lldpd config file for `hostname`
pub fn hostname_directive(hostname: &str) -> String {
    format!("configure system hostname {}\n", hostname)
}

/// What a reconciliation changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Flags written to the defaults file
    pub daemon_args: DaemonArgs,
    /// Whether the hostname directive was written
    pub hostname_written: bool,
    /// Interfaces whose firmware LLDP agent was turned off
    pub disabled_nics: Vec<String>,
}

/// Applies configuration snapshots to the host
#[derive(Debug, Clone)]
pub struct Reconciler {
    settings: CharmSettings,
    disabler: FirmwareLldpDisabler,
}

impl Reconciler {
    /// Create a reconciler for the given settings
    pub fn new(settings: CharmSettings) -> Self {
        let disabler = FirmwareLldpDisabler::from_settings(&settings);
        Self { settings, disabler }
    }

    /// Settings in use
    pub fn settings(&self) -> &CharmSettings {
        &self.settings
    }

    /// Apply `config` and reload the service
    ///
    /// # Errors
    ///
    /// - [`Error::FileWrite`] if a generated file cannot be written
    /// - [`Error::CommandFailed`] if ethtool exits non-zero
    /// - [`Error::ServiceManager`] if neither reload nor restart succeeds
    pub async fn reconcile(
        &self,
        config: &CharmConfig,
        identity: &HostIdentity,
        devices: &dyn DeviceLister,
        runner: &dyn CommandRunner,
        services: &dyn ServiceManager,
    ) -> Result<ReconcileReport> {
        config.validate()?;

        let disabled_nics = if config.i40e_lldp_stop {
            self.disabler.disable(devices, runner).await?
        } else {
            Vec::new()
        };

        let hostname_written = if config.short_name {
            let content = hostname_directive(identity.short_hostname());
            write_file(&self.settings.config_file, &content).await?;
            info!(
                "Advertising short hostname {} via {}",
                identity.short_hostname(),
                self.settings.config_file.display()
            );
            true
        } else {
            false
        };

        let daemon_args = build_daemon_args(config, identity.machine_id.as_deref());
        write_file(&self.settings.defaults_file, &daemon_args.render()).await?;
        info!("Wrote {} to {}", daemon_args, self.settings.defaults_file.display());

        reload_or_restart(services, &self.settings.service).await?;

        Ok(ReconcileReport {
            daemon_args,
            hostname_written,
            disabled_nics,
        })
    }
}

async fn write_file(path: &Path, content: &str) -> Result<()> {
    tokio::fs::write(path, content)
        .await
        .map_err(|e| Error::file_write(path, e))?;
    debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// Reload `service`, restarting it when the reload is refused
pub async fn reload_or_restart(services: &dyn ServiceManager, service: &str) -> Result<()> {
    if services.reload(service).await? {
        debug!("Reloaded {}", service);
        return Ok(());
    }

    warn!("Reload of {} failed, restarting", service);
    services.restart(service).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let args = build_daemon_args(&CharmConfig::default(), None);
        assert!(args.is_empty());
        assert_eq!(args.to_string(), "DAEMON_ARGS=\"\"");
        assert_eq!(args.render(), "DAEMON_ARGS=\"\"\n");
    }

    #[test]
    fn test_interfaces_and_snmp() {
        let config = CharmConfig::default()
            .with_interfaces_regex("eth*")
            .with_enable_snmp(true);
        let args = build_daemon_args(&config, None);
        assert_eq!(args.to_string(), "DAEMON_ARGS=\"-I eth* -x\"");
    }

    #[test]
    fn test_all_flags_in_order() {
        let config = CharmConfig::default()
            .with_enable_snmp(true)
            .with_interfaces_regex("en*,!enx*")
            .with_systemid_from_interface("eno1");
        let args = build_daemon_args(&config, Some("7"));
        assert_eq!(
            args.flags(),
            &["-C eno1", "-I en*,!enx*", "-x", "-S juju_machine_id=7"]
        );
        assert_eq!(
            args.to_string(),
            "DAEMON_ARGS=\"-C eno1 -I en*,!enx* -x -S juju_machine_id=7\""
        );
    }

    #[test]
    fn test_machine_id_only() {
        let args = build_daemon_args(&CharmConfig::default(), Some("0/lxd/3"));
        assert_eq!(args.joined(), "-S juju_machine_id=0/lxd/3");
    }

    #[test]
    fn test_empty_machine_id_omitted() {
        let args = build_daemon_args(&CharmConfig::default(), Some(""));
        assert!(args.is_empty());
    }

    #[test]
    fn test_short_name_does_not_change_args() {
        let config = CharmConfig::default().with_short_name(true).with_i40e_lldp_stop(true);
        assert!(build_daemon_args(&config, None).is_empty());
    }

    #[test]
    fn test_hostname_directive() {
        assert_eq!(
            hostname_directive("node1"),
            "configure system hostname node1\n"
        );
    }
}
