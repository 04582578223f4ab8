//! Core data-access layer for the messenger store.
//! This crate owns the user/message invariants; front ends only call services.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{DbLocation, StoreConfig};
pub use db::{DbError, DbResult, SessionMode, Store};
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status, LogTarget};
pub use model::message::{ConversationStat, LatestMessage, Message, MessageId, NewMessage};
pub use model::user::{DuplicateFields, NewUser, User, UserField, UserId};
pub use model::validation::ValidationError;
pub use repo::{ConstraintViolation, RepoError, RepoResult};
pub use service::message_service::MessageService;
pub use service::user_service::UserService;
pub use service::{ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
