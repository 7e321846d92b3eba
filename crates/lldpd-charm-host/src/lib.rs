// # lldpd-charm-host
//
// Host-backed implementations of the lldpd operator capabilities.
//
// - [`SysfsDeviceLister`]: interfaces from `/sys/class/net` and their driver symlink
// - [`ProcessCommandRunner`]: runs commands with `tokio::process`
// - [`AptPackageManager`]: `apt-get update` / `apt-get install`
// - [`SystemdServiceManager`]: `systemctl reload` / `systemctl restart`
// - [`system_hostname`]: the OS host name
//
// ## Platform Support
//
// Linux hosts with apt and systemd. The sysfs lister works anywhere a
// directory laid out like `/sys/class/net` exists, which is how it is tested.

pub mod sysfs;
pub mod process;
pub mod apt;
pub mod systemd;
pub mod identity;

pub use sysfs::SysfsDeviceLister;
pub use process::ProcessCommandRunner;
pub use apt::AptPackageManager;
pub use systemd::SystemdServiceManager;
pub use identity::system_hostname;

use async_trait::async_trait;
use lldpd_charm_core::traits::{CommandRunner, ExecResult};
use lldpd_charm_core::{CharmSettings, HostCapabilities, Result};
use std::path::Path;
use std::sync::Arc;

/// Capabilities backed by the real host
pub fn host_capabilities(settings: &CharmSettings) -> HostCapabilities {
    capabilities_with(settings, Arc::new(ProcessCommandRunner::new()))
}

fn capabilities_with(settings: &CharmSettings, runner: Arc<dyn CommandRunner>) -> HostCapabilities {
    HostCapabilities {
        devices: Box::new(SysfsDeviceLister::new(&settings.sysfs_net)),
        runner: Box::new(SharedRunner(runner.clone())),
        packages: Box::new(AptPackageManager::new(runner.clone())),
        services: Box::new(SystemdServiceManager::new(runner)),
    }
}

/// One runner handed out to every capability
struct SharedRunner(Arc<dyn CommandRunner>);

#[async_trait]
impl CommandRunner for SharedRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<ExecResult> {
        self.0.run(program, args).await
    }

    async fn is_available(&self, program: &Path) -> bool {
        self.0.is_available(program).await
    }
}
