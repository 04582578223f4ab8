//! Message domain model and read projections.
//!
//! # Invariants
//! - `message_text` is stored exactly as submitted.
//! - `user_id` always matches `user.id` on returned records.

use crate::model::user::{User, UserId};
use crate::model::validation::{validate_message_text, ValidationError};
use serde::{Deserialize, Serialize};

/// Store-assigned surrogate key of a message row.
pub type MessageId = i64;

/// Persisted message joined with its author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub user_id: UserId,
    pub message_text: String,
    /// Unix epoch milliseconds, assigned on insert.
    pub created_at: i64,
    pub user: User,
}

/// Request to post a message on behalf of an existing user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub user_id: UserId,
    pub message_text: String,
}

impl NewMessage {
    pub fn new(user_id: UserId, message_text: impl Into<String>) -> Self {
        Self {
            user_id,
            message_text: message_text.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_message_text(&self.message_text)
    }
}

/// Per-user message aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationStat {
    pub username: String,
    pub message_count: u64,
    /// `None` for users who never posted.
    pub last_message_at: Option<i64>,
}

/// Most recent message of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestMessage {
    pub user_id: UserId,
    pub username: String,
    pub message_id: MessageId,
    pub message_text: String,
    pub created_at: i64,
}
