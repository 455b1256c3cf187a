//! Storage error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by the file-backed stores.
#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    /// A record with the same `(user, item, timestamp)` identity exists.
    #[error("duplicate record: user {user_id}, item {item_id} at {timestamp}")]
    DuplicateRecord {
        user_id: String,
        item_id: u32,
        timestamp: DateTime<Utc>,
    },

    /// The user is not in the profile file.
    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// No paper composition was logged for this user and timestamp.
    #[error("no paper for {user_id} at {timestamp}")]
    UnknownPaper {
        user_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl StoreError {
    /// Returns `true` if the error is about a missing entry rather than a
    /// conflicting write.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::UnknownUser(_) | StoreError::UnknownPaper { .. })
    }
}
