//! sysfs-backed device lister
//!
//! Every entry of `/sys/class/net` is an interface. Physical ones carry a
//! `device/driver` symlink into `/sys/bus/*/drivers/<driver>`; virtual ones
//! (lo, bridges, bonds, veths) have no `device` directory at all.

use async_trait::async_trait;
use lldpd_charm_core::traits::{DeviceLister, NicRecord};
use lldpd_charm_core::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::trace;

/// Lists interfaces from a sysfs `class/net` directory
#[derive(Debug, Clone)]
pub struct SysfsDeviceLister {
    root: PathBuf,
}

impl SysfsDeviceLister {
    /// Create a lister rooted at `root` (normally `/sys/class/net`)
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Resolve the driver symlink of one interface
    ///
    /// Returns `None` when the interface has no driver binding.
    async fn driver_link(interface: &Path) -> Option<PathBuf> {
        let link = interface.join("device").join("driver");

        let metadata = fs::symlink_metadata(&link).await.ok()?;
        if !metadata.file_type().is_symlink() {
            return None;
        }

        match fs::canonicalize(&link).await {
            Ok(target) => Some(target),
            // Dangling link: the target's name still identifies the driver
            Err(_) => fs::read_link(&link).await.ok(),
        }
    }
}

#[async_trait]
impl DeviceLister for SysfsDeviceLister {
    async fn list(&self) -> Result<Vec<NicRecord>> {
        let mut entries = fs::read_dir(&self.root).await.map_err(|e| {
            Error::device_discovery(format!("Failed to read {}: {}", self.root.display(), e))
        })?;

        let mut nics = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            Error::device_discovery(format!("Failed to read {}: {}", self.root.display(), e))
        })? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };

            let record = match Self::driver_link(&entry.path()).await {
                Some(target) => NicRecord::new(name, target),
                None => NicRecord::virtual_device(name),
            };
            trace!("Interface {} driver {:?}", record.name, record.driver_name());
            nics.push(record);
        }

        nics.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(nics)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::tempdir;

    fn add_nic(root: &Path, drivers: &Path, name: &str, driver: &str) {
        let device = root.join(name).join("device");
        std::fs::create_dir_all(&device).unwrap();
        let target = drivers.join(driver);
        std::fs::create_dir_all(&target).unwrap();
        symlink(&target, device.join("driver")).unwrap();
    }

    #[tokio::test]
    async fn test_lists_physical_and_virtual_interfaces() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("class-net");
        let drivers = dir.path().join("drivers");

        add_nic(&root, &drivers, "enp59s0f0", "i40e");
        add_nic(&root, &drivers, "eno1", "tg3");
        std::fs::create_dir_all(root.join("lo")).unwrap();

        let nics = SysfsDeviceLister::new(&root).list().await.unwrap();

        assert_eq!(nics.len(), 3);
        assert_eq!(nics[0].name, "eno1");
        assert_eq!(nics[0].driver_name(), Some("tg3"));
        assert!(nics[1].uses_driver("i40e"));
        assert_eq!(nics[2].name, "lo");
        assert!(nics[2].driver_link.is_none());
    }

    #[tokio::test]
    async fn test_driver_that_is_not_a_symlink_is_ignored() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("class-net");
        std::fs::create_dir_all(root.join("eth0").join("device").join("driver")).unwrap();

        let nics = SysfsDeviceLister::new(&root).list().await.unwrap();
        assert_eq!(nics, vec![NicRecord::virtual_device("eth0")]);
    }

    #[tokio::test]
    async fn test_dangling_driver_link_keeps_driver_name() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("class-net");
        let device = root.join("eth0").join("device");
        std::fs::create_dir_all(&device).unwrap();
        symlink(dir.path().join("gone").join("i40e"), device.join("driver")).unwrap();

        let nics = SysfsDeviceLister::new(&root).list().await.unwrap();
        assert!(nics[0].uses_driver("i40e"));
    }

    #[tokio::test]
    async fn test_missing_root_is_an_error() {
        let dir = tempdir().unwrap();
        let result = SysfsDeviceLister::new(dir.path().join("absent")).list().await;
        assert!(matches!(result, Err(Error::DeviceDiscovery(_))));
    }
}
