//! Configuration types for the lldpd operator
//!
//! - [`CharmConfig`]: the operator options set by the user, one snapshot per hook
//! - [`CharmSettings`]: the fixed paths and names the operator touches on the host
//! - [`HostIdentity`]: facts about the host that feed the generated files

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Operator configuration snapshot
///
/// Keys follow the JSON shape printed by `config-get --format=json`.
/// Missing keys take their defaults, so `{}` is a valid snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CharmConfig {
    /// Disable the firmware LLDP agent on i40e NICs
    pub i40e_lldp_stop: bool,

    /// Interface whose MAC address is used as the chassis ID (`-C`)
    pub systemid_from_interface: Option<String>,

    /// Interfaces lldpd listens on (`-I`)
    pub interfaces_regex: Option<String>,

    /// Enable the SNMP subagent (`-x`)
    pub enable_snmp: bool,

    /// Advertise the short hostname instead of the FQDN
    pub short_name: bool,
}

impl CharmConfig {
    /// Parse a snapshot from JSON
    ///
    /// Values are not checked here; [`CharmConfig::validate`] runs when the
    /// snapshot is applied.
    pub fn from_json_str(json: &str) -> Result<Self, crate::Error> {
        serde_json::from_str(json)
            .map_err(|e| crate::Error::config(format!("Invalid charm config: {}", e)))
    }

    /// Set the chassis ID interface
    pub fn with_systemid_from_interface(mut self, interface: impl Into<String>) -> Self {
        self.systemid_from_interface = Some(interface.into());
        self
    }

    /// Set the interface pattern
    pub fn with_interfaces_regex(mut self, regex: impl Into<String>) -> Self {
        self.interfaces_regex = Some(regex.into());
        self
    }

    /// Enable or disable SNMP
    pub fn with_enable_snmp(mut self, enabled: bool) -> Self {
        self.enable_snmp = enabled;
        self
    }

    /// Enable or disable the short hostname
    pub fn with_short_name(mut self, enabled: bool) -> Self {
        self.short_name = enabled;
        self
    }

    /// Enable or disable the i40e firmware LLDP stop
    pub fn with_i40e_lldp_stop(mut self, enabled: bool) -> Self {
        self.i40e_lldp_stop = enabled;
        self
    }

    /// Chassis ID interface, `None` when unset or empty
    pub fn systemid_from_interface(&self) -> Option<&str> {
        non_empty(self.systemid_from_interface.as_deref())
    }

    /// Interface pattern, `None` when unset or empty
    pub fn interfaces_regex(&self) -> Option<&str> {
        non_empty(self.interfaces_regex.as_deref())
    }

    /// Validate the snapshot
    ///
    /// String options end up inside a double-quoted shell assignment, so
    /// quotes and line breaks are rejected.
    pub fn validate(&self) -> Result<(), crate::Error> {
        for (key, value) in [
            ("systemid-from-interface", self.systemid_from_interface()),
            ("interfaces-regex", self.interfaces_regex()),
        ] {
            if let Some(value) = value
                && value.contains(['"', '\n', '\r', '\\', '`', '$'])
            {
                return Err(crate::Error::config(format!(
                    "{} contains characters that cannot appear in DAEMON_ARGS: {:?}",
                    key, value
                )));
            }
        }
        Ok(())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Host paths and names used by the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharmSettings {
    /// Daemon defaults file holding `DAEMON_ARGS`
    #[serde(default = "default_defaults_file")]
    pub defaults_file: PathBuf,

    /// lldpd configuration file holding the hostname directive
    #[serde(default = "default_config_file")]
    pub config_file: PathBuf,

    /// Directory listing the network interfaces
    #[serde(default = "default_sysfs_net")]
    pub sysfs_net: PathBuf,

    /// ethtool(8) binary
    #[serde(default = "default_ethtool")]
    pub ethtool: PathBuf,

    /// Privilege escalation program prefixed to ethtool (none when empty)
    #[serde(default = "default_escalation")]
    pub escalation: Option<String>,

    /// Driver whose firmware LLDP agent gets disabled
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Packages installed by the install hook
    #[serde(default = "default_packages")]
    pub packages: Vec<String>,

    /// Service reloaded after reconciliation
    #[serde(default = "default_service")]
    pub service: String,

    /// File persisting readiness and deferred hooks
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

impl CharmSettings {
    /// Validate the settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.driver.is_empty() {
            return Err(crate::Error::config("Driver name cannot be empty"));
        }
        if self.packages.is_empty() || self.packages.iter().any(|p| p.is_empty()) {
            return Err(crate::Error::config("Package list cannot be empty"));
        }
        if self.service.is_empty() {
            return Err(crate::Error::config("Service name cannot be empty"));
        }
        if self.ethtool.as_os_str().is_empty() {
            return Err(crate::Error::config("ethtool path cannot be empty"));
        }
        Ok(())
    }
}

impl Default for CharmSettings {
    fn default() -> Self {
        Self {
            defaults_file: default_defaults_file(),
            config_file: default_config_file(),
            sysfs_net: default_sysfs_net(),
            ethtool: default_ethtool(),
            escalation: default_escalation(),
            driver: default_driver(),
            packages: default_packages(),
            service: default_service(),
            state_file: default_state_file(),
        }
    }
}

fn default_defaults_file() -> PathBuf {
    PathBuf::from("/etc/default/lldpd")
}

fn default_config_file() -> PathBuf {
    PathBuf::from("/etc/lldpd.conf")
}

fn default_sysfs_net() -> PathBuf {
    PathBuf::from("/sys/class/net")
}

fn default_ethtool() -> PathBuf {
    PathBuf::from("/usr/sbin/ethtool")
}

fn default_escalation() -> Option<String> {
    Some("sudo".to_string())
}

fn default_driver() -> String {
    "i40e".to_string()
}

fn default_packages() -> Vec<String> {
    vec!["lldpd".to_string()]
}

fn default_service() -> String {
    "lldpd".to_string()
}

fn default_state_file() -> PathBuf {
    PathBuf::from(".lldpd-charm-state.json")
}

/// Facts about the host the operator runs on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    /// Host name as reported by the OS
    pub hostname: String,
    /// Machine identifier assigned by the orchestrator
    pub machine_id: Option<String>,
}

impl HostIdentity {
    /// Create a host identity; an empty machine id counts as absent
    pub fn new(hostname: impl Into<String>, machine_id: Option<String>) -> Self {
        Self {
            hostname: hostname.into(),
            machine_id: machine_id.filter(|id| !id.is_empty()),
        }
    }

    /// Host name up to the first dot
    pub fn short_hostname(&self) -> &str {
        self.hostname.split('.').next().unwrap_or(&self.hostname)
    }
}
