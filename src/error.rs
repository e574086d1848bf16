//! Engine error taxonomy

use serde::Serialize;
use thiserror::Error;

/// Errors reported to the host. None of them stop a running simulation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineError {
    /// A message other than INIT arrived while the engine is stopped
    #[error("engine is not running; send INIT first")]
    NotRunning,
    /// INIT arrived while the engine is already running
    #[error("engine is already running; send STOP before INIT")]
    AlreadyRunning,
    /// INIT was missing a required field or carried a non-finite value
    #[error("invalid INIT payload: {0}")]
    InvalidInit(String),
    /// A wire message could not be decoded
    #[error("malformed message: {0}")]
    Decode(String),
    /// The engine task has exited and no longer accepts messages
    #[error("engine mailbox closed")]
    Disconnected,
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Decode(e.to_string())
    }
}
