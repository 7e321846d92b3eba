// # Device Lister Trait
//
// Defines the interface for enumerating network interfaces.
//
// ## Implementations
//
// - sysfs-backed (Linux): `lldpd-charm-host` crate
// - In-memory: `StaticDeviceLister` in this crate, for tests
//
// ## Usage
//
// ```rust,ignore
// use lldpd_charm_core::DeviceLister;
//
// let nics = lister.list().await?;
// for nic in nics.iter().filter(|n| n.uses_driver("i40e")) {
//     println!("{} is bound to i40e", nic.name);
// }
// ```

use async_trait::async_trait;
use std::path::PathBuf;

/// A network interface and the target of its driver symlink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NicRecord {
    /// Interface name (e.g. "enp59s0f0")
    pub name: String,
    /// Resolved target of `<iface>/device/driver`; `None` for virtual devices
    pub driver_link: Option<PathBuf>,
}

impl NicRecord {
    /// Create a record for an interface bound to a driver
    pub fn new(name: impl Into<String>, driver_link: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            driver_link: Some(driver_link.into()),
        }
    }

    /// Create a record for an interface without a driver binding
    pub fn virtual_device(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            driver_link: None,
        }
    }

    /// Final path component of the driver link target
    pub fn driver_name(&self) -> Option<&str> {
        self.driver_link
            .as_deref()
            .and_then(|link| link.file_name())
            .and_then(|name| name.to_str())
    }

    /// Check whether the interface is bound to `driver`
    pub fn uses_driver(&self, driver: &str) -> bool {
        self.driver_name() == Some(driver)
    }
}

/// Trait for network interface enumeration
///
/// Implementations report every interface the OS exposes, including ones
/// without a driver binding. Filtering is the caller's job.
#[async_trait]
pub trait DeviceLister: Send + Sync {
    /// List network interfaces
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<NicRecord>)`: All interfaces, in no particular order
    /// - `Err(Error)`: The interface directory could not be read
    async fn list(&self) -> Result<Vec<NicRecord>, crate::Error>;
}
