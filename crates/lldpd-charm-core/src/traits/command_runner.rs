//! External command execution interface
//!
//! Commands are passed as a program plus argument vector, never through a
//! shell. Runners report the exit code and captured output in an
//! [`ExecResult`]; a non-zero exit is a normal result, not an error. Callers
//! decide whether it is fatal with [`ExecResult::check`].

use async_trait::async_trait;
use std::path::Path;

/// Result of an external command execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// The exit code of the command (0 = success, -1 = killed by signal)
    pub exit_code: i32,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
}

impl ExecResult {
    /// A successful result with no output
    pub fn ok() -> Self {
        Self {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// A failed result with the given exit code and stderr
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Returns true if the command succeeded (exit code 0)
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns the combined output (stdout + stderr) for error messages
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }

    /// Turn a non-zero exit into [`crate::Error::CommandFailed`]
    pub fn check(self, command: &str) -> Result<Self, crate::Error> {
        if self.success() {
            Ok(self)
        } else {
            Err(crate::Error::CommandFailed {
                command: command.to_string(),
                exit_code: self.exit_code,
                output: self.combined_output(),
            })
        }
    }
}

/// Render a program and its arguments as one line for logs and errors
pub fn format_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trait for external command runners
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` and wait for it to exit
    ///
    /// # Returns
    ///
    /// - `Ok(ExecResult)`: The command ran (whatever its exit code)
    /// - `Err(Error::CommandSpawn)`: The command could not be started
    async fn run(&self, program: &str, args: &[String]) -> Result<ExecResult, crate::Error>;

    /// Check whether `program` can be executed
    ///
    /// Paths with a directory component are checked directly; bare names
    /// are looked up on `PATH`.
    async fn is_available(&self, program: &Path) -> bool;
}
