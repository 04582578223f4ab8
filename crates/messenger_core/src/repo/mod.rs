//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//! - Classify SQLite constraint failures into semantic variants.
//!
//! # Invariants
//! - Repositories never open transactions; they run inside the caller's
//!   session and borrow its connection.
//! - Read paths reject rows that cannot be decoded instead of masking them.

pub mod message_repo;
pub mod user_repo;

use crate::db::DbError;
use rusqlite::ffi;
use thiserror::Error;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for persistence and query operations.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0}")]
    Db(#[from] DbError),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
    #[error("{0}")]
    Constraint(ConstraintViolation),
}

/// Integrity constraint rejected by SQLite itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintViolation {
    /// Columns are reported as `table.column`.
    #[error("unique constraint failed on {}", columns.join(", "))]
    Unique { columns: Vec<String> },
    #[error("foreign key constraint failed")]
    ForeignKey,
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match classify_constraint(&value) {
            Some(violation) => Self::Constraint(violation),
            None => Self::Db(DbError::Sqlite(value)),
        }
    }
}

fn classify_constraint(err: &rusqlite::Error) -> Option<ConstraintViolation> {
    let rusqlite::Error::SqliteFailure(failure, message) = err else {
        return None;
    };

    match failure.extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
            Some(ConstraintViolation::Unique {
                columns: message.as_deref().map(unique_columns).unwrap_or_default(),
            })
        }
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(ConstraintViolation::ForeignKey),
        _ => None,
    }
}

// SQLite reports "UNIQUE constraint failed: users.username, users.email".
fn unique_columns(message: &str) -> Vec<String> {
    message
        .split_once(':')
        .map(|(_, columns)| {
            columns
                .split(',')
                .map(|column| column.trim().to_string())
                .filter(|column| !column.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
