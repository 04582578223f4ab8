//! SQLite storage bootstrap, schema migrations and units of work.
//!
//! # Responsibility
//! - Open and configure the single SQLite connection shared by services.
//! - Apply schema migrations in deterministic order.
//! - Run service work inside scoped transactions (sessions).
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - No application data is read or written before migrations succeed.
//! - A session either commits all of its statements or none of them.

pub mod migrations;
mod open;
mod store;

pub use open::{open_db, open_db_in_memory};
pub use store::{SessionMode, Store};

use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

/// Store-level failure: connection, transaction or schema bookkeeping.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error(
        "database schema version {db_version} is newer than supported {latest_supported}"
    )]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    #[error("failed to close database connection: {0}")]
    Close(#[source] rusqlite::Error),
}
