//! Domain records for users and messages.
//!
//! # Responsibility
//! - Define the persisted records returned by services.
//! - Define create requests and their boundary validation.
//!
//! # Invariants
//! - Ids and `created_at` values are always store-assigned; create requests
//!   carry neither.
//! - Records are write-once: nothing in core updates them in place.

pub mod message;
pub mod user;
pub mod validation;
