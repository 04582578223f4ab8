//! User repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert/lookup/list/delete APIs over the `users` table.
//! - Report which unique fields an incoming user would collide with.

use crate::model::user::{DuplicateFields, NewUser, User, UserField, UserId};
use crate::repo::RepoResult;
use rusqlite::{params, Connection, OptionalExtension, Row};

const USER_SELECT_SQL: &str = "SELECT
    id,
    username,
    email,
    created_at
FROM users";

/// Repository interface for user persistence.
pub trait UserRepository {
    /// Inserts one user and returns the assigned id.
    fn insert_user(&self, user: &NewUser) -> RepoResult<UserId>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    /// Returns which of `username` / `email` are already taken.
    fn find_conflicts(&self, username: &str, email: &str) -> RepoResult<DuplicateFields>;
    /// Lists every user ordered by id.
    fn list_users(&self) -> RepoResult<Vec<User>>;
    /// Removes one user row. Returns `false` when no row matched.
    fn delete_user(&self, id: UserId) -> RepoResult<bool>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn insert_user(&self, user: &NewUser) -> RepoResult<UserId> {
        self.conn.execute(
            "INSERT INTO users (username, email) VALUES (?1, ?2);",
            params![user.username.as_str(), user.email.as_str()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let user = self
            .conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_user_row,
            )
            .optional()?;
        Ok(user)
    }

    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let user = self
            .conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE username = ?1;"),
                [username],
                parse_user_row,
            )
            .optional()?;
        Ok(user)
    }

    fn find_conflicts(&self, username: &str, email: &str) -> RepoResult<DuplicateFields> {
        let mut stmt = self.conn.prepare(
            "SELECT username = ?1, email = ?2
             FROM users
             WHERE username = ?1 OR email = ?2;",
        )?;
        let mut rows = stmt.query(params![username, email])?;
        let mut conflicts = DuplicateFields::default();
        while let Some(row) = rows.next()? {
            if row.get::<_, bool>(0)? {
                conflicts.mark(UserField::Username);
            }
            if row.get::<_, bool>(1)? {
                conflicts.mark(UserField::Email);
            }
        }
        Ok(conflicts)
    }

    fn list_users(&self) -> RepoResult<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        Ok(users)
    }

    fn delete_user(&self, id: UserId) -> RepoResult<bool> {
        let changed = self.conn.execute("DELETE FROM users WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }
}

fn parse_user_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        email: row.get("email")?,
        created_at: row.get("created_at")?,
    })
}
