//! Core use-case services.
//!
//! # Responsibility
//! - Enforce domain rules (validation, uniqueness, author existence).
//! - Run every call inside exactly one store session.
//! - Translate storage failures into caller-facing error kinds.
//!
//! # Invariants
//! - No session outlives the service call that opened it.
//! - Constraint violations that slip past the in-session checks are
//!   reported as the same domain error the check would have produced.

pub mod message_service;
pub mod user_service;

use crate::db::DbError;
use crate::model::user::{DuplicateFields, UserId};
use crate::model::validation::ValidationError;
use crate::repo::RepoError;
use log::{error, warn};
use std::time::Instant;
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Caller-facing error for user and message use-cases.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("a user with this {0} already exists")]
    DuplicateUser(DuplicateFields),
    #[error("user not found: {0}")]
    UnknownUser(UserId),
    #[error("{0}")]
    Store(#[from] RepoError),
    /// A row written in this session could not be read back.
    #[error("inconsistent state: {0}")]
    InconsistentState(&'static str),
}

impl From<DbError> for ServiceError {
    fn from(value: DbError) -> Self {
        Self::Store(RepoError::Db(value))
    }
}

impl ServiceError {
    /// Stable metadata-only code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::DuplicateUser(_) => "duplicate_user",
            Self::UnknownUser(_) => "unknown_user",
            Self::Store(_) => "store_error",
            Self::InconsistentState(_) => "inconsistent_state",
        }
    }
}

// Error text may echo user input (emails), so only the code is logged.
fn log_failure(event: &str, started_at: Instant, err: &ServiceError) {
    match err {
        ServiceError::Store(_) | ServiceError::InconsistentState(_) => error!(
            "event={event} module=service status=error duration_ms={} error_code={}",
            started_at.elapsed().as_millis(),
            err.code()
        ),
        _ => warn!(
            "event={event} module=service status=error duration_ms={} error_code={}",
            started_at.elapsed().as_millis(),
            err.code()
        ),
    }
}
