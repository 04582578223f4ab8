//! User use-case service.
//!
//! # Responsibility
//! - Create users with boundary validation and uniqueness enforcement.
//! - Serve user lookups and deletion with explicit message cascade.
//!
//! # Invariants
//! - The conflict check and the insert share one `SessionMode::Write`
//!   session, so no other writer can interleave between them.
//! - A UNIQUE violation on insert still reports `DuplicateUser`.

use crate::db::{SessionMode, Store};
use crate::model::user::{DuplicateFields, NewUser, User, UserField, UserId};
use crate::repo::message_repo::{MessageRepository, SqliteMessageRepository};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::repo::{ConstraintViolation, RepoError};
use crate::service::{log_failure, ServiceError, ServiceResult};
use log::{debug, info};
use std::sync::Arc;
use std::time::Instant;

/// Use-case service for users.
#[derive(Clone)]
pub struct UserService {
    store: Arc<Store>,
}

impl UserService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Creates one user and returns it with its assigned id and timestamp.
    ///
    /// # Errors
    /// - `Validation` for a blank/oversized username or malformed email.
    /// - `DuplicateUser` naming every field that is already taken.
    pub fn create(&self, request: &NewUser) -> ServiceResult<User> {
        let started_at = Instant::now();
        let result = request
            .validate()
            .map_err(ServiceError::from)
            .and_then(|()| self.create_validated(request));

        match &result {
            Ok(user) => info!(
                "event=user_create module=service status=ok user_id={} duration_ms={}",
                user.id,
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("user_create", started_at, err),
        }
        result
    }

    fn create_validated(&self, request: &NewUser) -> ServiceResult<User> {
        self.store.open_session(SessionMode::Write, |tx| -> ServiceResult<User> {
            let repo = SqliteUserRepository::new(tx);

            let conflicts = repo.find_conflicts(&request.username, &request.email)?;
            if !conflicts.is_empty() {
                return Err(ServiceError::DuplicateUser(conflicts));
            }

            let id = repo.insert_user(request).map_err(map_insert_error)?;
            repo.get_user(id)?
                .ok_or(ServiceError::InconsistentState(
                    "created user not found in read-back",
                ))
        })
    }

    /// Lists every user ordered by id.
    pub fn get_all(&self) -> ServiceResult<Vec<User>> {
        self.read("user_list", |repo| repo.list_users())
    }

    /// Returns `None` when no user has this id.
    pub fn get_by_id(&self, id: UserId) -> ServiceResult<Option<User>> {
        self.read("user_get", |repo| repo.get_user(id))
    }

    pub fn get_by_username(&self, username: &str) -> ServiceResult<Option<User>> {
        self.read("user_get_by_username", |repo| {
            repo.find_by_username(username)
        })
    }

    /// Deletes a user together with all of their messages.
    ///
    /// Returns `false` when no user had this id.
    pub fn delete(&self, id: UserId) -> ServiceResult<bool> {
        let started_at = Instant::now();
        let result = self
            .store
            .open_session(SessionMode::Write, |tx| -> ServiceResult<bool> {
                let messages_removed =
                    SqliteMessageRepository::new(tx).delete_messages_for_user(id)?;
                let removed = SqliteUserRepository::new(tx).delete_user(id)?;
                debug!(
                    "event=user_delete module=service status=progress user_id={id} messages_removed={messages_removed}"
                );
                Ok(removed)
            });

        match &result {
            Ok(removed) => info!(
                "event=user_delete module=service status=ok user_id={id} removed={removed} duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("user_delete", started_at, err),
        }
        result
    }

    fn read<T>(
        &self,
        event: &str,
        query: impl FnOnce(&SqliteUserRepository<'_>) -> Result<T, RepoError>,
    ) -> ServiceResult<T> {
        let started_at = Instant::now();
        let result = self.store.open_session(SessionMode::Read, |tx| {
            query(&SqliteUserRepository::new(tx)).map_err(ServiceError::from)
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

fn map_insert_error(err: RepoError) -> ServiceError {
    match err {
        RepoError::Constraint(ConstraintViolation::Unique { ref columns }) => {
            let mut fields = DuplicateFields::default();
            for column in columns {
                match column.as_str() {
                    "users.username" => fields.mark(UserField::Username),
                    "users.email" => fields.mark(UserField::Email),
                    _ => {}
                }
            }
            if fields.is_empty() {
                ServiceError::Store(err)
            } else {
                ServiceError::DuplicateUser(fields)
            }
        }
        other => ServiceError::Store(other),
    }
}
