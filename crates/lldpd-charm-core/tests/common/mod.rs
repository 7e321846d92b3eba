//! Test doubles and common utilities for contract tests
//!
//! Every double is `Clone` and shares its recordings through an `Arc`, so a
//! test can hand one copy to the charm and inspect the other afterwards.

#![allow(dead_code)]

use async_trait::async_trait;
use lldpd_charm_core::config::{CharmSettings, HostIdentity};
use lldpd_charm_core::error::{Error, Result};
use lldpd_charm_core::traits::{CommandRunner, ExecResult, PackageManager, ServiceManager};
use lldpd_charm_core::{HostCapabilities, StaticDeviceLister};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// One recorded command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

/// A CommandRunner that records invocations instead of running them
#[derive(Clone, Default)]
pub struct RecordingCommandRunner {
    invocations: Arc<Mutex<Vec<Invocation>>>,
    /// Results keyed by an argument the command contains (e.g. a NIC name)
    results: Arc<Mutex<HashMap<String, ExecResult>>>,
    missing: Arc<Mutex<Vec<PathBuf>>>,
}

impl RecordingCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make any command mentioning `arg` return `result`
    pub fn with_result_for(self, arg: &str, result: ExecResult) -> Self {
        self.results
            .lock()
            .unwrap()
            .insert(arg.to_string(), result);
        self
    }

    /// Report `program` as not installed
    pub fn with_missing(self, program: impl Into<PathBuf>) -> Self {
        self.missing.lock().unwrap().push(program.into());
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }
}

#[async_trait]
impl CommandRunner for RecordingCommandRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<ExecResult> {
        self.invocations.lock().unwrap().push(Invocation {
            program: program.to_string(),
            args: args.to_vec(),
        });

        let results = self.results.lock().unwrap();
        let result = args
            .iter()
            .find_map(|arg| results.get(arg))
            .cloned()
            .unwrap_or_else(ExecResult::ok);
        Ok(result)
    }

    async fn is_available(&self, program: &Path) -> bool {
        !self.missing.lock().unwrap().iter().any(|p| p == program)
    }
}

/// A PackageManager that records calls
#[derive(Clone, Default)]
pub struct RecordingPackageManager {
    updates: Arc<Mutex<usize>>,
    installed: Arc<Mutex<Vec<String>>>,
    fail_install: bool,
}

impl RecordingPackageManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// A package manager whose install always fails
    pub fn failing() -> Self {
        Self {
            fail_install: true,
            ..Self::default()
        }
    }

    pub fn update_count(&self) -> usize {
        *self.updates.lock().unwrap()
    }

    pub fn installed(&self) -> Vec<String> {
        self.installed.lock().unwrap().clone()
    }
}

#[async_trait]
impl PackageManager for RecordingPackageManager {
    async fn update(&self) -> Result<()> {
        *self.updates.lock().unwrap() += 1;
        Ok(())
    }

    async fn install(&self, packages: &[String]) -> Result<()> {
        if self.fail_install {
            return Err(Error::package_manager("E: Unable to locate package lldpd"));
        }
        self.installed.lock().unwrap().extend(packages.iter().cloned());
        Ok(())
    }
}

/// A ServiceManager that records reloads and restarts
#[derive(Clone)]
pub struct RecordingServiceManager {
    reloads: Arc<Mutex<Vec<String>>>,
    restarts: Arc<Mutex<Vec<String>>>,
    reload_succeeds: bool,
}

impl Default for RecordingServiceManager {
    fn default() -> Self {
        Self {
            reloads: Arc::default(),
            restarts: Arc::default(),
            reload_succeeds: true,
        }
    }
}

impl RecordingServiceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// A service manager that refuses reloads
    pub fn refusing_reload() -> Self {
        Self {
            reload_succeeds: false,
            ..Self::default()
        }
    }

    pub fn reloads(&self) -> Vec<String> {
        self.reloads.lock().unwrap().clone()
    }

    pub fn restarts(&self) -> Vec<String> {
        self.restarts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ServiceManager for RecordingServiceManager {
    async fn reload(&self, service: &str) -> Result<bool> {
        self.reloads.lock().unwrap().push(service.to_string());
        Ok(self.reload_succeeds)
    }

    async fn restart(&self, service: &str) -> Result<()> {
        self.restarts.lock().unwrap().push(service.to_string());
        Ok(())
    }
}

/// Recorders shared between a test and the capabilities it hands out
#[derive(Clone, Default)]
pub struct Recorders {
    pub runner: RecordingCommandRunner,
    pub packages: RecordingPackageManager,
    pub services: RecordingServiceManager,
}

impl Recorders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build host capabilities backed by these recorders
    pub fn capabilities(&self, devices: StaticDeviceLister) -> HostCapabilities {
        HostCapabilities {
            devices: Box::new(devices),
            runner: Box::new(self.runner.clone()),
            packages: Box::new(self.packages.clone()),
            services: Box::new(self.services.clone()),
        }
    }
}

/// Settings pointing every generated file into `dir`
pub fn settings_in(dir: &Path) -> CharmSettings {
    CharmSettings {
        defaults_file: dir.join("lldpd.default"),
        config_file: dir.join("lldpd.conf"),
        sysfs_net: dir.join("sys-class-net"),
        state_file: dir.join("state.json"),
        ..CharmSettings::default()
    }
}

/// Identity of a host named `node1` without a machine id
pub fn plain_identity() -> HostIdentity {
    HostIdentity::new("node1", None)
}

/// The ethtool invocation expected for `nic` with default settings
pub fn expected_ethtool(nic: &str) -> Invocation {
    Invocation {
        program: "sudo".to_string(),
        args: vec![
            "/usr/sbin/ethtool".to_string(),
            "--set-priv-flags".to_string(),
            nic.to_string(),
            "disable-fw-lldp".to_string(),
            "on".to_string(),
        ],
    }
}

/// Collects formatted log output for assertions
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a subscriber writing into this capture on the current thread
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }

    /// Number of captured lines containing `needle`
    pub fn count(&self, needle: &str) -> usize {
        self.contents().lines().filter(|line| line.contains(needle)).count()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
