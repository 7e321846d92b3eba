// # lldpd-charm - hook entry point
//
// This binary is a THIN integration layer: it reads the environment, sets up
// logging, builds the operator and dispatches exactly one hook. All operator
// logic lives in lldpd-charm-core.
//
// ## Hook selection
//
// 1. First command-line argument (`lldpd-charm config-changed`)
// 2. Basename of `JUJU_DISPATCH_PATH` (`hooks/config-changed`)
// 3. Basename of the executable (symlinked as `hooks/install`, ...)
//
// ## Configuration
//
// - `LLDPD_CHARM_CONFIG_FILE`: JSON snapshot of the operator options. When
//   unset, the snapshot comes from `config-get --format=json`.
// - `JUJU_MACHINE_ID`: machine identifier advertised with `-S`
// - `LLDPD_CHARM_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// Host settings, all optional:
// - `LLDPD_CHARM_STATE_FILE`, `LLDPD_CHARM_DEFAULTS_FILE`, `LLDPD_CHARM_LLDPD_CONF`
// - `LLDPD_CHARM_SYSFS_NET`, `LLDPD_CHARM_ETHTOOL`, `LLDPD_CHARM_ESCALATION`
// - `LLDPD_CHARM_DRIVER`, `LLDPD_CHARM_PACKAGES` (comma-separated), `LLDPD_CHARM_SERVICE`
//
// ## Example
//
// ```bash
// export JUJU_MACHINE_ID=3
// export LLDPD_CHARM_CONFIG_FILE=/tmp/config.json
// lldpd-charm config-changed
// ```

use anyhow::{Context, Result};
use lldpd_charm_core::traits::{CommandRunner, StateStore};
use lldpd_charm_core::{
    CharmConfig, CharmEvent, CharmSettings, DispatchOutcome, FileStateStore, Hook, HostIdentity,
    LldpdCharm,
};
use lldpd_charm_host::ProcessCommandRunner;
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
#[derive(Debug, Clone, Copy)]
enum CharmExitCode {
    /// Hook handled, deferred, or not ours
    Success = 0,
    /// Configuration or startup error
    ConfigError = 1,
    /// The hook handler failed
    HookFailed = 2,
}

impl From<CharmExitCode> for ExitCode {
    fn from(code: CharmExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Process configuration read from the environment
#[derive(Debug)]
struct Config {
    hook_name: Option<String>,
    config_file: Option<PathBuf>,
    machine_id: Option<String>,
    log_level: String,
    settings: CharmSettings,
}

impl Config {
    /// Load configuration from the process environment and arguments
    fn from_env() -> Result<Self> {
        let args: Vec<String> = env::args().collect();
        Self::from_lookup(&args, |key| env::var(key).ok())
    }

    /// Load configuration from `args` and an environment lookup
    fn from_lookup(args: &[String], lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let mut settings = CharmSettings::default();
        if let Some(path) = var("LLDPD_CHARM_STATE_FILE") {
            settings.state_file = path.into();
        }
        if let Some(path) = var("LLDPD_CHARM_DEFAULTS_FILE") {
            settings.defaults_file = path.into();
        }
        if let Some(path) = var("LLDPD_CHARM_LLDPD_CONF") {
            settings.config_file = path.into();
        }
        if let Some(path) = var("LLDPD_CHARM_SYSFS_NET") {
            settings.sysfs_net = path.into();
        }
        if let Some(path) = var("LLDPD_CHARM_ETHTOOL") {
            settings.ethtool = path.into();
        }
        if let Some(escalation) = lookup("LLDPD_CHARM_ESCALATION") {
            // Explicitly empty disables escalation
            settings.escalation = Some(escalation).filter(|e| !e.is_empty());
        }
        if let Some(driver) = var("LLDPD_CHARM_DRIVER") {
            settings.driver = driver;
        }
        if let Some(packages) = var("LLDPD_CHARM_PACKAGES") {
            settings.packages = packages
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(service) = var("LLDPD_CHARM_SERVICE") {
            settings.service = service;
        }

        Ok(Self {
            hook_name: resolve_hook_name(args, var("JUJU_DISPATCH_PATH").as_deref()),
            config_file: var("LLDPD_CHARM_CONFIG_FILE").map(PathBuf::from),
            machine_id: var("JUJU_MACHINE_ID"),
            log_level: var("LLDPD_CHARM_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            settings,
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.hook_name.is_none() {
            anyhow::bail!(
                "No hook name given. Pass it as the first argument \
                or set JUJU_DISPATCH_PATH."
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "LLDPD_CHARM_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        self.settings
            .validate()
            .context("Invalid host settings")?;

        Ok(())
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

/// Pick the hook name from the arguments, the dispatch path or argv[0]
fn resolve_hook_name(args: &[String], dispatch_path: Option<&str>) -> Option<String> {
    let basename = |path: &str| {
        Path::new(path)
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
    };

    args.get(1)
        .cloned()
        .or_else(|| dispatch_path.and_then(basename))
        .or_else(|| args.first().and_then(|argv0| basename(argv0)))
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return CharmExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return CharmExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.level())
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return CharmExitCode::ConfigError.into();
    }

    // One hook per process, handled to completion
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return CharmExitCode::ConfigError.into();
        }
    };

    rt.block_on(async {
        match run_hook(config).await {
            Ok(code) => code,
            Err(e) => {
                error!("Hook failed: {:#}", e);
                CharmExitCode::HookFailed
            }
        }
    })
    .into()
}

/// Build the operator and dispatch the hook
async fn run_hook(config: Config) -> Result<CharmExitCode> {
    let hook_name = config.hook_name.as_deref().unwrap_or_default();
    let hook: Hook = match hook_name.parse() {
        Ok(hook) => hook,
        Err(_) => {
            debug!("No handler for hook {}, ignoring", hook_name);
            return Ok(CharmExitCode::Success);
        }
    };

    let runner = ProcessCommandRunner::new();
    let snapshot = snapshot_for(hook, config.config_file.as_deref(), &runner).await?;
    let hostname = lldpd_charm_host::system_hostname()?;
    let identity = HostIdentity::new(hostname, config.machine_id.clone());

    let state_store = FileStateStore::new(&config.settings.state_file)
        .await
        .with_context(|| {
            format!(
                "Failed to open state file {}",
                config.settings.state_file.display()
            )
        })?;
    debug!("State file: {}", state_store.path().display());

    let host = lldpd_charm_host::host_capabilities(&config.settings);
    let (charm, mut events) = LldpdCharm::new(
        config.settings,
        snapshot,
        identity,
        host,
        Box::new(state_store) as Box<dyn StateStore>,
    )?;

    let outcome = charm.dispatch(hook).await;
    log_events(&mut events);

    match outcome? {
        DispatchOutcome::Handled => info!("{} hook completed", hook),
        DispatchOutcome::Deferred => info!("{} hook deferred until install completes", hook),
    }
    Ok(CharmExitCode::Success)
}

/// Configuration snapshot for `hook`
///
/// Only config-changed applies the snapshot; every other hook runs with
/// defaults when it cannot be loaded so install always gets a chance to
/// mark the unit ready.
async fn snapshot_for(
    hook: Hook,
    config_file: Option<&Path>,
    runner: &dyn CommandRunner,
) -> Result<CharmConfig> {
    match load_snapshot(config_file, runner).await {
        Ok(snapshot) => Ok(snapshot),
        Err(e) if hook != Hook::ConfigChanged => {
            warn!("Configuration unavailable for {}, using defaults: {:#}", hook, e);
            Ok(CharmConfig::default())
        }
        Err(e) => Err(e),
    }
}

/// Load the configuration snapshot
async fn load_snapshot(
    config_file: Option<&Path>,
    runner: &dyn CommandRunner,
) -> Result<CharmConfig> {
    if let Some(path) = config_file {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        return Ok(CharmConfig::from_json_str(&json)?);
    }

    if runner.is_available(Path::new("config-get")).await {
        let args = vec!["--format=json".to_string()];
        let result = runner
            .run("config-get", &args)
            .await?
            .check("config-get --format=json")?;
        return Ok(CharmConfig::from_json_str(&result.stdout)?);
    }

    warn!("No configuration source available, using defaults");
    Ok(CharmConfig::default())
}

/// Log what the operator reported while handling the hook
fn log_events(events: &mut mpsc::Receiver<CharmEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            CharmEvent::StatusChanged(status) => info!("Unit status: {:?}", status),
            CharmEvent::HookDeferred { hook, deliveries } => {
                info!("Deferred {} (delivered {} time(s))", hook, deliveries)
            }
            CharmEvent::HookHandled { hook, redelivered } => {
                debug!("Handled {} (redelivered: {})", hook, redelivered)
            }
            CharmEvent::Installed { packages } => info!("Installed {}", packages.join(", ")),
            CharmEvent::Reconciled(report) => info!(
                "Applied {} (hostname file: {}, firmware LLDP disabled on: [{}])",
                report.daemon_args,
                report.hostname_written,
                report.disabled_nics.join(", ")
            ),
        }
    }
}
