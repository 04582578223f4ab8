//! User domain model.
//!
//! # Invariants
//! - `username` and `email` are each unique across all users.
//! - A user owns its messages: removing the user removes them.

use crate::model::validation::{validate_email, validate_username, ValidationError};
use serde::{Deserialize, Serialize};

/// Store-assigned surrogate key of a user row.
pub type UserId = i64;

/// Persisted user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    /// Unix epoch milliseconds, assigned on insert.
    pub created_at: i64,
}

/// Request to create a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
}

impl NewUser {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
        }
    }

    /// Checks field-level rules. Uniqueness is checked by the service.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_username(&self.username)?;
        validate_email(&self.email)
    }
}

/// Unique user field involved in a collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserField {
    Username,
    Email,
}

impl UserField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::Email => "email",
        }
    }
}

/// Set of fields that collided with an existing user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateFields {
    pub username: bool,
    pub email: bool,
}

impl DuplicateFields {
    pub fn is_empty(&self) -> bool {
        !self.username && !self.email
    }

    pub fn mark(&mut self, field: UserField) {
        match field {
            UserField::Username => self.username = true,
            UserField::Email => self.email = true,
        }
    }

    pub fn fields(&self) -> Vec<UserField> {
        let mut fields = Vec::with_capacity(2);
        if self.username {
            fields.push(UserField::Username);
        }
        if self.email {
            fields.push(UserField::Email);
        }
        fields
    }
}

impl std::fmt::Display for DuplicateFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.fields().into_iter().map(UserField::as_str).collect();
        write!(f, "{}", names.join(" and "))
    }
}
