//! Host collaborator interfaces
//!
//! The operator installs its package and reloads its service through these
//! traits. Implementations live in `lldpd-charm-host`.

use async_trait::async_trait;

/// Trait for the system package manager
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Refresh the package index
    async fn update(&self) -> Result<(), crate::Error>;

    /// Install `packages`, leaving already-installed ones untouched
    async fn install(&self, packages: &[String]) -> Result<(), crate::Error>;
}

/// Trait for the system service manager
#[async_trait]
pub trait ServiceManager: Send + Sync {
    /// Reload `service`
    ///
    /// Returns `Ok(false)` when the service manager refused the reload,
    /// so the caller can fall back to a restart.
    async fn reload(&self, service: &str) -> Result<bool, crate::Error>;

    /// Restart `service`
    async fn restart(&self, service: &str) -> Result<(), crate::Error>;
}
