use messenger_core::db::migrations::latest_version;
use messenger_core::db::{open_db, open_db_in_memory, DbError};
use messenger_core::{SessionMode, Store, StoreConfig};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_object_exists(&conn, "table", "users");
    assert_object_exists(&conn, "table", "messages");
    assert_object_exists(&conn, "index", "idx_messages_user_id");
}

#[test]
fn connections_enforce_foreign_keys() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("messenger.db");

    let first = Store::open(&StoreConfig::file(&path)).unwrap();
    first
        .open_session(SessionMode::Write, |tx| {
            tx.execute(
                "INSERT INTO users (username, email) VALUES ('alice123', 'alice@example.com');",
                [],
            )
            .map_err(DbError::from)
        })
        .unwrap();
    first.shutdown().unwrap();

    let second = Store::open(&StoreConfig::file(&path)).unwrap();
    second.initialize().unwrap();
    assert_eq!(second.schema_version().unwrap(), latest_version());

    let users: i64 = second
        .open_session(SessionMode::Read, |tx| {
            tx.query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
                .map_err(DbError::from)
        })
        .unwrap();
    assert_eq!(users, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn file_store_uses_wal_journal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wal.db");

    let conn = open_db(&path).unwrap();
    let mode: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_object_exists(conn: &Connection, kind: &str, name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = ?1 AND name = ?2
            );",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "{kind} {name} does not exist");
}
