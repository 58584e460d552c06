// src/error.rs
//! Error types for the hike tracker

use crate::tracking::session::{Command, SessionState};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial error: {0}")]
    Serial(#[from] tokio_serial::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// The one-shot fix at start could not be obtained (no permission,
    /// no device, timeout). The session is left untouched.
    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    /// A control command was issued from a state that does not permit it.
    #[error("Invalid transition: cannot {command} while {state}")]
    InvalidTransition {
        command: Command,
        state: SessionState,
    },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Error: {0}")]
    Other(String),
}

impl TrackerError {
    /// True for usage errors the UI layer caused, as opposed to resource failures.
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, TrackerError::InvalidTransition { .. })
    }
}

impl From<anyhow::Error> for TrackerError {
    fn from(error: anyhow::Error) -> Self {
        TrackerError::Other(error.to_string())
    }
}
