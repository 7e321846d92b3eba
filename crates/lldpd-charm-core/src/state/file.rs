// # File State Store
//
// File-based implementation of StateStore with crash recovery.
//
// ## Purpose
//
// Every hook runs in a new process. The readiness flag and the deferred
// queue must survive between them, and survive a crash halfway through a
// hook.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good state
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "state": {
//     "ready": true,
//     "ready_since": "2025-01-09T12:00:00Z",
//     "deferred": []
//   }
// }
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::state_store::{CharmState, DeferredHook, StateStore};

/// State file format version
const STATE_FILE_VERSION: &str = "1.0";

/// File-based state store with crash recovery
///
/// Every mutation is written through immediately.
///
/// # Example
///
/// ```rust,no_run
/// use lldpd_charm_core::state::FileStateStore;
/// use lldpd_charm_core::traits::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new(".lldpd-charm-state.json").await?;
///     store.set_ready(true).await?;
///
///     let reopened = FileStateStore::new(".lldpd-charm-state.json").await?;
///     assert!(reopened.is_ready().await?);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    state: Arc<RwLock<FileState>>,
}

#[derive(Debug)]
struct FileState {
    charm: CharmState,
    dirty: bool,
}

/// Serializable state file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct StateFileFormat {
    version: String,
    state: CharmState,
}

/// Why a state file could not be loaded
enum LoadFailure {
    /// The file exists but could not be read
    Unreadable(Error),
    /// The file was read but is not a valid state file
    Corrupt(Error),
}

impl FileStateStore {
    /// Create or load a file state store
    ///
    /// This will:
    /// 1. Create parent directories if needed
    /// 2. Try to load the existing state file
    /// 3. If it is corrupted, try the backup
    /// 4. If both fail, start uninitialized
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create state directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let charm = Self::load_state_with_recovery(&path).await?;

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(FileState {
                charm,
                dirty: false,
            })),
        })
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_state_with_recovery(path: &Path) -> Result<CharmState, Error> {
        let err = match Self::load_state(path).await {
            Ok(state) => {
                tracing::debug!(
                    "Loaded state from {}: ready={}, {} deferred",
                    path.display(),
                    state.ready,
                    state.deferred.len()
                );
                return Ok(state);
            }
            Err(LoadFailure::Unreadable(e)) => return Err(e),
            Err(LoadFailure::Corrupt(e)) => e,
        };

        tracing::warn!(
            "State file appears corrupted: {}. Attempting recovery from backup.",
            err
        );

        let backup_path = Self::backup_path(path);
        if !backup_path.exists() {
            tracing::warn!("No backup file found. Starting uninitialized.");
            return Ok(CharmState::default());
        }

        match Self::load_state(&backup_path).await {
            Ok(state) => {
                tracing::info!("Recovered state from backup: ready={}", state.ready);
                if let Err(restore_err) = fs::copy(&backup_path, path).await {
                    tracing::error!(
                        "Failed to restore state file from backup: {}",
                        restore_err
                    );
                }
                Ok(state)
            }
            Err(LoadFailure::Unreadable(backup_err)) | Err(LoadFailure::Corrupt(backup_err)) => {
                tracing::error!(
                    "Backup also unusable: {}. Starting uninitialized.",
                    backup_err
                );
                Ok(CharmState::default())
            }
        }
    }

    async fn load_state(path: &Path) -> Result<CharmState, LoadFailure> {
        if !path.exists() {
            tracing::debug!("State file does not exist: {}", path.display());
            return Ok(CharmState::default());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            LoadFailure::Unreadable(Error::state_store(format!(
                "Failed to read state file {}: {}",
                path.display(),
                e
            )))
        })?;

        let state_file: StateFileFormat = serde_json::from_str(&content).map_err(|e| {
            LoadFailure::Corrupt(Error::state_store(format!(
                "Failed to parse state file {}: {}",
                path.display(),
                e
            )))
        })?;

        if state_file.version != STATE_FILE_VERSION {
            tracing::warn!(
                "State file version mismatch: expected {}, got {}. Attempting to load anyway.",
                STATE_FILE_VERSION,
                state_file.version
            );
        }

        Ok(state_file.state)
    }

    /// Write state to file atomically
    async fn write_state(&self) -> Result<(), Error> {
        let mut guard = self.state.write().await;

        let state_file = StateFileFormat {
            version: STATE_FILE_VERSION.to_string(),
            state: guard.charm.clone(),
        };
        let json = serde_json::to_string_pretty(&state_file)
            .map_err(|e| Error::state_store(format!("Failed to serialize state: {}", e)))?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.sync_all().await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to sync temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists()
            && let Err(e) = fs::copy(&self.path, Self::backup_path(&self.path)).await
        {
            tracing::warn!("Failed to create backup: {}", e);
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        guard.dirty = false;
        tracing::trace!("State written to file: {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }

    async fn mutate(&self, f: impl FnOnce(&mut CharmState) + Send) -> Result<(), Error> {
        {
            let mut guard = self.state.write().await;
            f(&mut guard.charm);
            guard.dirty = true;
        }
        self.write_state().await
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn is_ready(&self) -> Result<bool, Error> {
        Ok(self.state.read().await.charm.ready)
    }

    async fn set_ready(&self, ready: bool) -> Result<(), Error> {
        self.mutate(|state| {
            state.ready = ready;
            state.ready_since = ready.then(chrono::Utc::now);
        })
        .await
    }

    async fn state(&self) -> Result<CharmState, Error> {
        Ok(self.state.read().await.charm.clone())
    }

    async fn push_deferred(&self, deferred: DeferredHook) -> Result<(), Error> {
        self.mutate(|state| state.deferred.push(deferred)).await
    }

    async fn set_deferred(&self, deferred: Vec<DeferredHook>) -> Result<(), Error> {
        self.mutate(|state| state.deferred = deferred).await
    }

    async fn flush(&self) -> Result<(), Error> {
        let dirty = self.state.read().await.dirty;
        if dirty {
            self.write_state().await
        } else {
            Ok(())
        }
    }
}
