//! Core types shared across the atomlab backend.
//!
//! This crate holds the error-handling foundation and the strongly-typed
//! identifiers that cross crate boundaries (internal user ids and Telegram
//! account ids).

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParseIdError, TelegramId, UserId};
