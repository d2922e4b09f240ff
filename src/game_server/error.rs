//! Error - Session error taxonomy
//!
//! Configuration and asset problems are fatal at construction time.
//! Per-tick anomalies never surface here; they are logged and dropped.

use thiserror::Error;

use crate::game_server::simulation::GameState;

/// Errors raised while building or driving a race session
#[derive(Debug, Error)]
pub enum SessionError {
    /// Configuration could not be parsed
    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Configuration parsed but is not usable
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// A roster entry requested at session start does not exist
    #[error("missing {kind} asset at roster index {index}")]
    MissingAsset { kind: &'static str, index: usize },

    /// An action was requested from a state that does not allow it
    #[error("cannot {action} while in {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: GameState,
    },

    /// IO error while reading a config file
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Create a configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid transition error
    pub fn invalid_transition(action: &'static str, state: GameState) -> Self {
        Self::InvalidTransition { action, state }
    }
}
