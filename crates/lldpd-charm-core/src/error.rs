//! Error types for the lldpd operator
//!
//! This module defines all error types used throughout the crate.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for operator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the lldpd operator
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// State store-related errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// A generated file could not be written
    #[error("Failed to write {}: {source}", path.display())]
    FileWrite {
        /// Target path
        path: PathBuf,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// An external command could not be spawned
    #[error("Failed to execute command '{command}': {source}")]
    CommandSpawn {
        /// The command line that failed to start
        command: String,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// An external command exited non-zero
    #[error("Command failed: '{command}' (exit code {exit_code}): {output}")]
    CommandFailed {
        /// The command line
        command: String,
        /// The exit code (-1 when killed by a signal)
        exit_code: i32,
        /// Combined stdout/stderr output
        output: String,
    },

    /// Network device enumeration errors
    #[error("Device discovery error: {0}")]
    DeviceDiscovery(String),

    /// Package manager errors
    #[error("Package manager error: {0}")]
    PackageManager(String),

    /// Service manager errors
    #[error("Service manager error: {0}")]
    ServiceManager(String),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a file write error
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Create a device discovery error
    pub fn device_discovery(msg: impl Into<String>) -> Self {
        Self::DeviceDiscovery(msg.into())
    }

    /// Create a package manager error
    pub fn package_manager(msg: impl Into<String>) -> Self {
        Self::PackageManager(msg.into())
    }

    /// Create a service manager error
    pub fn service_manager(msg: impl Into<String>) -> Self {
        Self::ServiceManager(msg.into())
    }
}
