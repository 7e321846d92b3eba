//! NIC firmware LLDP disabler
//!
//! Intel 700-series NICs (driver `i40e`) run an LLDP agent in firmware that
//! consumes LLDP frames before lldpd can see them. The driver exposes a
//! private flag to turn that agent off:
//!
//! ```text
//! sudo /usr/sbin/ethtool --set-priv-flags <nic> disable-fw-lldp on
//! ```
//!
//! Hosts without such NICs are common, so finding none is logged and
//! treated as success.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::config::CharmSettings;
use crate::error::Result;
use crate::traits::{CommandRunner, DeviceLister, NicRecord, format_command};

/// Disables the firmware LLDP agent on every NIC bound to one driver
#[derive(Debug, Clone)]
pub struct FirmwareLldpDisabler {
    driver: String,
    ethtool: PathBuf,
    escalation: Option<String>,
}

impl FirmwareLldpDisabler {
    /// Create a disabler for `driver` using the given ethtool binary
    pub fn new(driver: impl Into<String>, ethtool: impl Into<PathBuf>) -> Self {
        Self {
            driver: driver.into(),
            ethtool: ethtool.into(),
            escalation: None,
        }
    }

    /// Create a disabler from the operator settings
    pub fn from_settings(settings: &CharmSettings) -> Self {
        Self {
            driver: settings.driver.clone(),
            ethtool: settings.ethtool.clone(),
            escalation: settings.escalation.clone().filter(|e| !e.is_empty()),
        }
    }

    /// Prefix every invocation with a privilege escalation program
    pub fn with_escalation(mut self, program: impl Into<String>) -> Self {
        self.escalation = Some(program.into());
        self
    }

    /// Driver this disabler targets
    pub fn driver(&self) -> &str {
        &self.driver
    }

    /// Names of the interfaces bound to the target driver
    pub async fn matching_nics(&self, lister: &dyn DeviceLister) -> Result<Vec<String>> {
        let nics = lister.list().await?;
        debug!("Found {} network interface(s)", nics.len());

        Ok(nics
            .into_iter()
            .filter(|nic| nic.uses_driver(&self.driver))
            .map(|nic| nic.name)
            .collect())
    }

    /// Program and arguments that disable firmware LLDP on `nic`
    pub fn command_for(&self, nic: &str) -> (String, Vec<String>) {
        let ethtool = self.ethtool.display().to_string();
        let flags = [
            "--set-priv-flags".to_string(),
            nic.to_string(),
            "disable-fw-lldp".to_string(),
            "on".to_string(),
        ];

        match &self.escalation {
            Some(program) => (
                program.clone(),
                std::iter::once(ethtool).chain(flags).collect(),
            ),
            None => (ethtool, flags.to_vec()),
        }
    }

    /// Disable firmware LLDP on every matching NIC
    ///
    /// # Returns
    ///
    /// - `Ok(names)`: Interfaces that were switched off (empty when none
    ///   matched or ethtool is missing)
    /// - `Err(Error)`: Enumeration failed, or a command failed to spawn or
    ///   exited non-zero. Interfaces before the failing one stay disabled.
    pub async fn disable(
        &self,
        lister: &dyn DeviceLister,
        runner: &dyn CommandRunner,
    ) -> Result<Vec<String>> {
        let nics = self.matching_nics(lister).await?;

        if nics.is_empty() {
            info!(
                "Can't find any {} NICs. Recommend setting the charm config i40e-lldp-stop to false",
                self.driver
            );
            return Ok(Vec::new());
        }

        if !runner.is_available(&self.ethtool).await {
            warn!(
                "{} not found, skipping firmware LLDP disable for {}",
                self.ethtool.display(),
                nics.join(", ")
            );
            return Ok(Vec::new());
        }

        for nic in &nics {
            info!("Using ethtool(8) to disable FW lldp for {}", nic);
            let (program, args) = self.command_for(nic);
            runner
                .run(&program, &args)
                .await?
                .check(&format_command(&program, &args))?;
        }

        Ok(nics)
    }
}

/// Device lister returning a fixed set of interfaces
///
/// Stands in for sysfs in tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct StaticDeviceLister {
    nics: Vec<NicRecord>,
}

impl StaticDeviceLister {
    /// Create a lister reporting `nics`
    pub fn new(nics: Vec<NicRecord>) -> Self {
        Self { nics }
    }

    /// Add an interface bound to `driver`
    pub fn with_nic(mut self, name: impl Into<String>, driver: &str) -> Self {
        self.nics.push(NicRecord::new(
            name,
            PathBuf::from("/sys/bus/pci/drivers").join(driver),
        ));
        self
    }

    /// Add an interface without a driver binding
    pub fn with_virtual(mut self, name: impl Into<String>) -> Self {
        self.nics.push(NicRecord::virtual_device(name));
        self
    }
}

#[async_trait]
impl DeviceLister for StaticDeviceLister {
    async fn list(&self) -> Result<Vec<NicRecord>> {
        Ok(self.nics.clone())
    }
}
