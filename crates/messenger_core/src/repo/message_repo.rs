//! Message repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert/list APIs over `messages`, always joined with the author.
//! - Own the aggregate queries (per-user statistics, latest message).
//!
//! # Invariants
//! - Message listings are sorted by `created_at ASC, id ASC`.
//! - Statistics include every user, with zero counts for silent users.

use crate::model::message::{ConversationStat, LatestMessage, Message, MessageId, NewMessage};
use crate::model::user::{User, UserId};
use crate::repo::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const MESSAGE_SELECT_SQL: &str = "SELECT
    m.id AS id,
    m.user_id AS user_id,
    m.message_text AS message_text,
    m.created_at AS created_at,
    u.username AS author_username,
    u.email AS author_email,
    u.created_at AS author_created_at
FROM messages m
INNER JOIN users u ON u.id = m.user_id";

/// Repository interface for message persistence and aggregates.
pub trait MessageRepository {
    /// Inserts one message and returns the assigned id.
    fn insert_message(&self, message: &NewMessage) -> RepoResult<MessageId>;
    fn get_message(&self, id: MessageId) -> RepoResult<Option<Message>>;
    /// Lists messages, optionally restricted to one author.
    fn list_messages(&self, user_id: Option<UserId>) -> RepoResult<Vec<Message>>;
    /// Deletes every message authored by `user_id`. Returns rows removed.
    fn delete_messages_for_user(&self, user_id: UserId) -> RepoResult<usize>;
    fn conversation_stats(&self) -> RepoResult<Vec<ConversationStat>>;
    fn latest_per_user(&self) -> RepoResult<Vec<LatestMessage>>;
}

/// SQLite-backed message repository.
pub struct SqliteMessageRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMessageRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl MessageRepository for SqliteMessageRepository<'_> {
    fn insert_message(&self, message: &NewMessage) -> RepoResult<MessageId> {
        self.conn.execute(
            "INSERT INTO messages (user_id, message_text) VALUES (?1, ?2);",
            params![message.user_id, message.message_text.as_str()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_message(&self, id: MessageId) -> RepoResult<Option<Message>> {
        let message = self
            .conn
            .query_row(
                &format!("{MESSAGE_SELECT_SQL} WHERE m.id = ?1;"),
                [id],
                parse_message_row,
            )
            .optional()?;
        Ok(message)
    }

    fn list_messages(&self, user_id: Option<UserId>) -> RepoResult<Vec<Message>> {
        let mut sql = String::from(MESSAGE_SELECT_SQL);
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(user_id) = user_id {
            sql.push_str(" WHERE m.user_id = ?");
            bind_values.push(Value::Integer(user_id));
        }
        sql.push_str(" ORDER BY m.created_at ASC, m.id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut messages = Vec::new();
        while let Some(row) = rows.next()? {
            messages.push(parse_message_row(row)?);
        }
        Ok(messages)
    }

    fn delete_messages_for_user(&self, user_id: UserId) -> RepoResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM messages WHERE user_id = ?1;", [user_id])?;
        Ok(removed)
    }

    fn conversation_stats(&self) -> RepoResult<Vec<ConversationStat>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                u.username AS username,
                COUNT(m.id) AS message_count,
                MAX(m.created_at) AS last_message_at
             FROM users u
             LEFT JOIN messages m ON m.user_id = u.id
             GROUP BY u.id
             ORDER BY message_count DESC, u.id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut stats = Vec::new();
        while let Some(row) = rows.next()? {
            let raw_count: i64 = row.get("message_count")?;
            let message_count = u64::try_from(raw_count).map_err(|_| {
                RepoError::InvalidData(format!("negative message count `{raw_count}`"))
            })?;
            stats.push(ConversationStat {
                username: row.get("username")?,
                message_count,
                last_message_at: row.get("last_message_at")?,
            });
        }
        Ok(stats)
    }

    fn latest_per_user(&self) -> RepoResult<Vec<LatestMessage>> {
        // Ties on created_at resolve to the highest id.
        let mut stmt = self.conn.prepare(
            "SELECT
                u.id AS user_id,
                u.username AS username,
                m.id AS message_id,
                m.message_text AS message_text,
                m.created_at AS created_at
             FROM messages m
             INNER JOIN users u ON u.id = m.user_id
             WHERE m.id = (
                SELECT latest.id
                FROM messages latest
                WHERE latest.user_id = m.user_id
                ORDER BY latest.created_at DESC, latest.id DESC
                LIMIT 1
             )
             ORDER BY u.id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut latest = Vec::new();
        while let Some(row) = rows.next()? {
            latest.push(LatestMessage {
                user_id: row.get("user_id")?,
                username: row.get("username")?,
                message_id: row.get("message_id")?,
                message_text: row.get("message_text")?,
                created_at: row.get("created_at")?,
            });
        }
        Ok(latest)
    }
}

fn parse_message_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    let user_id: UserId = row.get("user_id")?;
    Ok(Message {
        id: row.get("id")?,
        user_id,
        message_text: row.get("message_text")?,
        created_at: row.get("created_at")?,
        user: User {
            id: user_id,
            username: row.get("author_username")?,
            email: row.get("author_email")?,
            created_at: row.get("author_created_at")?,
        },
    })
}
