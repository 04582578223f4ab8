//! Store configuration.
//!
//! # Responsibility
//! - Describe where the database lives and how its connection is tuned.
//! - Provide defaults matching the CLI (`messenger.db`, 5s busy timeout).

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DB_FILE_NAME: &str = "messenger.db";
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Physical location of the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    File(PathBuf),
    /// Private in-memory database, discarded on shutdown.
    Memory,
}

/// Connection settings consumed by [`crate::db::Store::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub location: DbLocation,
    /// How long a writer waits on another process's lock before failing.
    pub busy_timeout: Duration,
    /// Enables `journal_mode=WAL` for file databases. Ignored for memory.
    pub wal: bool,
}

impl StoreConfig {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: DbLocation::File(path.into()),
            ..Self::default()
        }
    }

    pub fn in_memory() -> Self {
        Self {
            location: DbLocation::Memory,
            ..Self::default()
        }
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn with_wal(mut self, wal: bool) -> Self {
        self.wal = wal;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: DbLocation::File(PathBuf::from(DEFAULT_DB_FILE_NAME)),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            wal: true,
        }
    }
}
