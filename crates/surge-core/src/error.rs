//! Error types for the load generation engine.
//!
//! Two families live here:
//! - [`SurgeError`]: configuration-time failures. These are the only errors
//!   that reach the caller of [`LoadTest::run`](crate::LoadTest::run).
//! - [`StepError`]: failures of a single request. The step executor turns
//!   them into failure outcomes and never propagates them.

use thiserror::Error;

/// Result type alias using SurgeError.
pub type SurgeResult<T> = Result<T, SurgeError>;

/// Configuration error raised before or at the start of a run.
#[derive(Debug, Error)]
pub enum SurgeError {
    #[error("Scenario has no steps")]
    EmptyChain,

    #[error("Number of users must be greater than zero (got {0})")]
    InvalidUserCount(u32),

    #[error("Invalid configuration value for '{field}': {message}")]
    InvalidConfig { field: String, message: String },

    #[error("Step '{step}' has no request definition")]
    MissingRequest { step: String },

    #[error("Transport setup failed: {0}")]
    Transport(String),

    #[error("Load test is already running")]
    AlreadyRunning,
}

/// Failure of a single step attempt.
///
/// The `Display` output is what ends up in an outcome's failure message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StepError {
    #[error("Request construction failed: {0}")]
    Build(String),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Request factory panicked: {0}")]
    Panicked(String),
}

impl StepError {
    /// Shorthand used by request factories.
    pub fn build(message: impl Into<String>) -> Self {
        StepError::Build(message.into())
    }
}

impl From<reqwest::Error> for StepError {
    fn from(err: reqwest::Error) -> Self {
        StepError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for StepError {
    fn from(err: serde_json::Error) -> Self {
        StepError::Build(format!("JSON error: {}", err))
    }
}
