//! apt-backed package manager

use async_trait::async_trait;
use lldpd_charm_core::traits::{CommandRunner, PackageManager, format_command};
use lldpd_charm_core::{Error, Result};
use std::sync::Arc;
use tracing::info;

/// Installs packages with `apt-get`, non-interactively
pub struct AptPackageManager {
    runner: Arc<dyn CommandRunner>,
}

impl AptPackageManager {
    /// Create a package manager running commands through `runner`
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    async fn apt_get(&self, args: &[&str]) -> Result<()> {
        // Run through env(1) so dpkg never prompts for a conffile decision
        let args: Vec<String> = ["DEBIAN_FRONTEND=noninteractive", "apt-get"]
            .iter()
            .chain(args)
            .map(|s| s.to_string())
            .collect();
        let command = format_command("env", &args);

        self.runner
            .run("env", &args)
            .await?
            .check(&command)
            .map(|_| ())
            .map_err(|e| Error::package_manager(e.to_string()))
    }
}

#[async_trait]
impl PackageManager for AptPackageManager {
    async fn update(&self) -> Result<()> {
        info!("Updating package index");
        self.apt_get(&["update", "--quiet"]).await
    }

    async fn install(&self, packages: &[String]) -> Result<()> {
        info!("Installing packages: {}", packages.join(", "));
        let mut args = vec![
            "--assume-yes",
            "--option=Dpkg::Options::=--force-confold",
            "install",
        ];
        args.extend(packages.iter().map(String::as_str));
        self.apt_get(&args).await
    }
}
