//! Process-wide database handle and scoped sessions.
//!
//! # Responsibility
//! - Own the single configured SQLite connection for the process.
//! - Run caller work inside one transaction per session.
//! - Provide an explicit shutdown step that surfaces close failures.
//!
//! # Invariants
//! - A session commits only when its work returns `Ok`; every other exit
//!   path (error or panic) drops the transaction, which rolls it back.
//! - The connection lock is held for exactly the lifetime of one session.
//! - A panic inside a session poisons the connection mutex only after the
//!   transaction has been rolled back, so later sessions reclaim the lock.
//! - `SessionMode::Write` takes the SQLite write lock up front, so reads
//!   made during the session cannot be invalidated by another writer.

use super::migrations::{apply_migrations, current_version};
use super::open::open_with_config;
use super::{DbError, DbResult};
use crate::config::{DbLocation, StoreConfig};
use log::{debug, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Transaction flavor requested for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Deferred transaction; no write lock until the first write.
    Read,
    /// `BEGIN IMMEDIATE`. In-process callers already serialize on the
    /// connection mutex; the SQLite write lock also serializes other
    /// connections and processes on the same file.
    Write,
}

impl SessionMode {
    fn behavior(self) -> TransactionBehavior {
        match self {
            Self::Read => TransactionBehavior::Deferred,
            Self::Write => TransactionBehavior::Immediate,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

/// Shared database engine injected into services (usually as `Arc<Store>`).
pub struct Store {
    conn: Mutex<Connection>,
    location: DbLocation,
}

impl Store {
    /// Opens the configured database and brings its schema up to date.
    pub fn open(config: &StoreConfig) -> DbResult<Self> {
        let conn = open_with_config(config)?;
        Ok(Self {
            conn: Mutex::new(conn),
            location: config.location.clone(),
        })
    }

    /// Opens a private in-memory store. Mostly useful for tests.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::open(&StoreConfig::in_memory())
    }

    pub fn location(&self) -> &DbLocation {
        &self.location
    }

    /// Creates tables and indexes that are missing.
    ///
    /// Idempotent: an up-to-date database is left untouched.
    pub fn initialize(&self) -> DbResult<()> {
        let mut conn = self.lock();
        let applied = apply_migrations(&mut conn)?;
        debug!("event=db_initialize module=db status=ok migrations_applied={applied}");
        Ok(())
    }

    /// Returns the schema version currently recorded in the database.
    pub fn schema_version(&self) -> DbResult<u32> {
        let conn = self.lock();
        current_version(&conn)
    }

    /// Runs `work` as one unit of work.
    ///
    /// The transaction commits when `work` returns `Ok` and is rolled back
    /// otherwise. Errors raised by the store itself are converted into the
    /// caller's error type. A panic in `work` also rolls back; the next
    /// session recovers the poisoned lock.
    pub fn open_session<T, E, F>(&self, mode: SessionMode, work: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<DbError>,
    {
        let started_at = Instant::now();
        let mut conn = self.lock();
        let tx = conn
            .transaction_with_behavior(mode.behavior())
            .map_err(DbError::from)?;

        match work(&tx) {
            Ok(value) => {
                tx.commit().map_err(DbError::from)?;
                debug!(
                    "event=session module=db status=commit mode={} duration_ms={}",
                    mode.label(),
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(err) => {
                drop(tx);
                debug!(
                    "event=session module=db status=rollback mode={} duration_ms={}",
                    mode.label(),
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }

    /// Closes the underlying connection.
    pub fn shutdown(self) -> DbResult<()> {
        let conn = self.conn.into_inner().unwrap_or_else(PoisonError::into_inner);
        conn.close().map_err(|(_, err)| DbError::Close(err))?;
        info!("event=db_shutdown module=db status=ok");
        Ok(())
    }

    // A poisoning panic unwound through the session's transaction, whose
    // drop already rolled it back.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            warn!("event=db_lock_recovered module=db status=ok");
            self.conn.clear_poison();
            poisoned.into_inner()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{SessionMode, Store};
    use crate::config::{DbLocation, StoreConfig};
    use crate::db::DbError;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    fn rejected() -> DbError {
        DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows)
    }

    fn count_users(store: &Store) -> i64 {
        store
            .open_session(SessionMode::Read, |tx| {
                tx.query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
                    .map_err(DbError::from)
            })
            .unwrap()
    }

    #[test]
    fn session_commits_on_ok() {
        let store = Store::open_in_memory().unwrap();
        store
            .open_session(SessionMode::Write, |tx| {
                tx.execute(
                    "INSERT INTO users (username, email) VALUES ('a', 'a@example.com');",
                    [],
                )
                .map_err(DbError::from)
            })
            .unwrap();

        assert_eq!(count_users(&store), 1);
    }

    #[test]
    fn session_rolls_back_on_error() {
        let store = Store::open_in_memory().unwrap();
        let result = store.open_session(SessionMode::Write, |tx| -> Result<(), DbError> {
            tx.execute(
                "INSERT INTO users (username, email) VALUES ('a', 'a@example.com');",
                [],
            )?;
            Err(rejected())
        });

        assert!(matches!(
            result,
            Err(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
        ));
        assert_eq!(count_users(&store), 0);
    }

    #[test]
    fn panic_in_session_rolls_back_and_store_stays_usable() {
        let store = Store::open_in_memory().unwrap();

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            store.open_session(SessionMode::Write, |tx| -> Result<(), DbError> {
                tx.execute(
                    "INSERT INTO users (username, email) VALUES ('a', 'a@example.com');",
                    [],
                )?;
                panic!("session work failed");
            })
        }));
        assert!(outcome.is_err());
        assert_eq!(count_users(&store), 0);

        store
            .open_session(SessionMode::Write, |tx| {
                tx.execute(
                    "INSERT INTO users (username, email) VALUES ('b', 'b@example.com');",
                    [],
                )
                .map_err(DbError::from)
            })
            .unwrap();
        assert_eq!(count_users(&store), 1);
        store.shutdown().unwrap();
    }

    #[test]
    fn initialize_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let before = store.schema_version().unwrap();
        store.initialize().unwrap();
        store.initialize().unwrap();
        assert_eq!(store.schema_version().unwrap(), before);
    }

    #[test]
    fn location_reports_configured_target() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.location(), &DbLocation::Memory);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("located.sqlite3");
        let store = Store::open(&StoreConfig::file(&path)).unwrap();
        assert_eq!(store.location(), &DbLocation::File(path));
        store.shutdown().unwrap();
    }

    #[test]
    fn shutdown_closes_cleanly() {
        let store = Store::open_in_memory().unwrap();
        store.shutdown().unwrap();
    }
}
