//! Lifecycle error types.

use thiserror::Error;

use crate::EXIT_SUBSYSTEM_FAILURE;

/// Errors returned by [`ExitCoordinator::run`](crate::ExitCoordinator::run) or
/// [`SignalWatcher::install`](crate::SignalWatcher::install).
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Registering an OS signal handler failed.
    #[error("failed to install {signal} handler: {source}")]
    SignalInstall {
        signal: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The manager task ended without reporting an exit code (it panicked).
    #[error("lifecycle manager exited without reporting an exit code")]
    ManagerVanished,
}

impl LifecycleError {
    /// Exit status for a process whose lifecycle broke down. Distinct from
    /// [`EXIT_FORCED`](crate::EXIT_FORCED), which is reserved for a repeated signal.
    pub fn exit_code(&self) -> i32 {
        EXIT_SUBSYSTEM_FAILURE
    }
}

/// Failure reported by a [`Subsystem`](crate::Subsystem) while starting or stopping.
/// Carries the non-zero exit code the process should end with.
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct SubsystemError {
    reason: String,
    exit_code: Option<i32>,
}

impl SubsystemError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            exit_code: None,
        }
    }

    /// Override the exit code. Zero is ignored: a failure never exits cleanly.
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code).filter(|c| *c != 0);
        self
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code.unwrap_or(EXIT_SUBSYSTEM_FAILURE)
    }
}
