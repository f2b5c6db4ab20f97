//! Error types shared by the scenario engine and the process supervisor.

use std::path::PathBuf;
use thiserror::Error;

/// Raised when a scenario (or a raw simulator configuration) is inconsistent.
///
/// Always describes the first violation found; validation never aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Raised when the simulator process cannot be started or fails its handshake.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Simulator entry point not found: {}", .0.display())]
    EntrypointMissing(PathBuf),

    #[error("Simulator package root not found (checked {checked})")]
    PackageRootMissing { checked: String },

    #[error("Bun executable not found: {0}")]
    ExecutableNotFound(String),

    #[error("Failed to start simulator: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize simulator configuration to JSON")]
    Serialize(#[source] serde_json::Error),

    /// The simulator reported an error, sent a malformed event, or never
    /// reported a port. `output` holds whatever the process printed.
    #[error("{message}")]
    Simulator { message: String, output: String },
}

impl ProcessError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Captured simulator output, when the failure came from the handshake.
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Simulator { output, .. } => Some(output.as_str()),
            _ => None,
        }
    }
}

/// Errors surfaced by [`crate::session::SimulatorSession`].
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("request to simulator failed: {0}")]
    Http(#[from] ureq::Error),
}
