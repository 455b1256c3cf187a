//! Scheduling error types.
//!
//! These errors describe malformed configuration or requests. Collaborator
//! traits return `anyhow::Result`, so the scheduler wraps these in
//! `anyhow::Error`; callers can `downcast_ref::<ScheduleError>()` to classify
//! a failure without string matching.

use thiserror::Error;

/// Errors raised by the scheduling pipeline.
#[derive(Debug, Error, PartialEq)]
pub enum ScheduleError {
    /// Required scope or ratio configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The subject register name is not in the subject table.
    #[error("unknown subject: {0}")]
    UnknownSubject(String),

    /// The `set_mode` string is not a known mode.
    #[error("unknown set mode: {0}")]
    UnknownSetMode(String),

    /// The requesting user may not act on the target user.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A score sheet line could not be interpreted.
    #[error("score sheet line {line}: {message}")]
    ScoreSheet { line: usize, message: String },
}

impl ScheduleError {
    /// Shorthand for a [`ScheduleError::Configuration`].
    pub fn config(message: impl Into<String>) -> Self {
        ScheduleError::Configuration(message.into())
    }

    /// Returns `true` if the error stems from user or class configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ScheduleError::Configuration(_)
                | ScheduleError::UnknownSubject(_)
                | ScheduleError::UnknownSetMode(_)
        )
    }
}
