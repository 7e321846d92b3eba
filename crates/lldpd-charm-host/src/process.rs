//! Process-backed command runner
//!
//! Runs programs directly with an argument vector; nothing goes through a
//! shell, so NIC names and config values are never re-parsed.

use async_trait::async_trait;
use lldpd_charm_core::traits::{CommandRunner, ExecResult, format_command};
use lldpd_charm_core::{Error, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Runs commands with `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct ProcessCommandRunner;

impl ProcessCommandRunner {
    /// Create a runner
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessCommandRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<ExecResult> {
        let command = format_command(program, args);
        tracing::debug!(command = %command, "Executing command");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| Error::CommandSpawn {
                command: command.clone(),
                source: e,
            })?;

        let result = ExecResult {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        };

        if result.success() {
            tracing::trace!(command = %command, "Command succeeded");
        } else {
            tracing::warn!(
                command = %command,
                exit_code = result.exit_code,
                stderr = %result.stderr,
                "Command failed"
            );
        }

        Ok(result)
    }

    async fn is_available(&self, program: &Path) -> bool {
        if program.components().count() > 1 {
            match tokio::fs::metadata(program).await {
                Ok(metadata) => metadata.is_file(),
                Err(_) => false,
            }
        } else {
            which::which(program).is_ok()
        }
    }
}
