//! Command error taxonomy.
//!
//! A rejected command is dropped with no partial effect. Errors are replied
//! on request/response transports and logged on fire-and-forget ones; none
//! of them stop the control loop.

use thiserror::Error;

/// Why a command was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Out-of-range axis id, preset index or parameter.
    #[error("validation error: {0}")]
    Validation(String),

    /// Homing already active or axis exclusively owned.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Driver limits not yet negotiated.
    #[error("driver configuration not loaded")]
    ConfigurationNotLoaded,

    /// Command queue full; the command was not enqueued.
    #[error("command queue full")]
    QueueFull,

    /// Control loop is not running.
    #[error("control loop disconnected")]
    Disconnected,
}

impl CommandError {
    /// Short machine-readable kind, used in logs and transport replies.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Conflict(_) => "conflict",
            Self::ConfigurationNotLoaded => "configuration_not_loaded",
            Self::QueueFull => "queue_full",
            Self::Disconnected => "disconnected",
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}
