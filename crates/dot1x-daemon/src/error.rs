//! Daemon error types.

use thiserror::Error;

/// Result type for daemon operations.
pub type Result<T> = std::result::Result<T, DaemonError>;

/// Errors that can occur assembling or running the authenticator daemon.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// IO error (config file, pid file, etc).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// Error message.
        message: String,
    },

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The EAPOL or RADIUS transport failed.
    #[error("transport error: {0}")]
    Net(#[from] dot1x_net::NetError),

    /// The state machine or session table rejected an operation.
    #[error("core error: {0}")]
    Core(#[from] dot1x_core::CoreError),

    /// The wire codec rejected a frame.
    #[error("codec error: {0}")]
    Codec(#[from] dot1x_codec::CodecError),

    /// One of the dispatcher's cooperative tasks exited unexpectedly.
    #[error("dispatcher task '{task}' exited: {message}")]
    TaskExited {
        /// Which task exited (`eap_rx`, `eap_tx`, `radius_tx`, `radius_rx`, `timer`).
        task: &'static str,
        /// What it reported before exiting.
        message: String,
    },
}

impl DaemonError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a task-exited error.
    pub fn task_exited(task: &'static str, message: impl Into<String>) -> Self {
        Self::TaskExited {
            task,
            message: message.into(),
        }
    }
}
