//! Message use-case service.
//!
//! # Responsibility
//! - Post messages on behalf of existing users.
//! - Serve chronological listings and per-user aggregates.
//!
//! # Invariants
//! - The author lookup and the insert share one write session.
//! - A FOREIGN KEY violation on insert still reports `UnknownUser`.
//! - Lookups for users without messages return empty results, not errors.

use crate::db::{SessionMode, Store};
use crate::model::message::{ConversationStat, LatestMessage, Message, NewMessage};
use crate::model::user::UserId;
use crate::repo::message_repo::{MessageRepository, SqliteMessageRepository};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::repo::{ConstraintViolation, RepoError};
use crate::service::{log_failure, ServiceError, ServiceResult};
use log::{debug, info};
use std::sync::Arc;
use std::time::Instant;

/// Use-case service for messages.
#[derive(Clone)]
pub struct MessageService {
    store: Arc<Store>,
}

impl MessageService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Posts one message and returns it joined with its author.
    ///
    /// # Errors
    /// - `Validation` when `message_text` is empty.
    /// - `UnknownUser` when `user_id` does not exist; nothing is written.
    pub fn create(&self, request: &NewMessage) -> ServiceResult<Message> {
        let started_at = Instant::now();
        let result = request
            .validate()
            .map_err(ServiceError::from)
            .and_then(|()| self.create_validated(request));

        match &result {
            Ok(message) => info!(
                "event=message_create module=service status=ok message_id={} user_id={} duration_ms={}",
                message.id,
                message.user_id,
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("message_create", started_at, err),
        }
        result
    }

    fn create_validated(&self, request: &NewMessage) -> ServiceResult<Message> {
        self.store
            .open_session(SessionMode::Write, |tx| -> ServiceResult<Message> {
                let users = SqliteUserRepository::new(tx);
                if users.get_user(request.user_id)?.is_none() {
                    return Err(ServiceError::UnknownUser(request.user_id));
                }

                let messages = SqliteMessageRepository::new(tx);
                let id = messages
                    .insert_message(request)
                    .map_err(|err| map_insert_error(err, request.user_id))?;
                messages
                    .get_message(id)?
                    .ok_or(ServiceError::InconsistentState(
                        "created message not found in read-back",
                    ))
            })
    }

    /// Lists every message, oldest first.
    pub fn get_all(&self) -> ServiceResult<Vec<Message>> {
        self.read("message_list", |repo| repo.list_messages(None))
    }

    /// Lists one user's messages, oldest first. Unknown users yield `[]`.
    pub fn get_by_user(&self, user_id: UserId) -> ServiceResult<Vec<Message>> {
        self.read("message_list_by_user", |repo| {
            repo.list_messages(Some(user_id))
        })
    }

    /// One row per user, busiest first; ties keep user-id order.
    pub fn get_conversation_stats(&self) -> ServiceResult<Vec<ConversationStat>> {
        self.read("conversation_stats", |repo| repo.conversation_stats())
    }

    /// Most recent message of every user who has posted, by user id.
    pub fn get_latest_per_user(&self) -> ServiceResult<Vec<LatestMessage>> {
        self.read("message_latest_per_user", |repo| repo.latest_per_user())
    }

    fn read<T>(
        &self,
        event: &str,
        query: impl FnOnce(&SqliteMessageRepository<'_>) -> Result<T, RepoError>,
    ) -> ServiceResult<T> {
        let started_at = Instant::now();
        let result = self.store.open_session(SessionMode::Read, |tx| {
            query(&SqliteMessageRepository::new(tx)).map_err(ServiceError::from)
        });
        match &result {
            Ok(_) => debug!(
                "event={event} module=service status=ok duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure(event, started_at, err),
        }
        result
    }
}

fn map_insert_error(err: RepoError, user_id: UserId) -> ServiceError {
    match err {
        RepoError::Constraint(ConstraintViolation::ForeignKey) => ServiceError::UnknownUser(user_id),
        other => ServiceError::Store(other),
    }
}

#[cfg(test)]
mod tests {
    use super::map_insert_error;
    use crate::repo::{ConstraintViolation, RepoError};
    use crate::service::ServiceError;

    #[test]
    fn foreign_key_violation_maps_to_unknown_user() {
        let err = map_insert_error(RepoError::Constraint(ConstraintViolation::ForeignKey), 42);
        assert!(matches!(err, ServiceError::UnknownUser(42)));
    }
}
