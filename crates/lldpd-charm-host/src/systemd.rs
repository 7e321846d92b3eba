//! systemd-backed service manager

use async_trait::async_trait;
use lldpd_charm_core::traits::{CommandRunner, ServiceManager, format_command};
use lldpd_charm_core::{Error, Result};
use std::sync::Arc;

/// Controls services with `systemctl`
pub struct SystemdServiceManager {
    runner: Arc<dyn CommandRunner>,
}

impl SystemdServiceManager {
    /// Create a service manager running commands through `runner`
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn args(action: &str, service: &str) -> Vec<String> {
        vec![action.to_string(), service.to_string()]
    }
}

#[async_trait]
impl ServiceManager for SystemdServiceManager {
    async fn reload(&self, service: &str) -> Result<bool> {
        let result = self
            .runner
            .run("systemctl", &Self::args("reload", service))
            .await?;
        Ok(result.success())
    }

    async fn restart(&self, service: &str) -> Result<()> {
        let args = Self::args("restart", service);
        self.runner
            .run("systemctl", &args)
            .await?
            .check(&format_command("systemctl", &args))
            .map(|_| ())
            .map_err(|e| Error::service_manager(e.to_string()))
    }
}
