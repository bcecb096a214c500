//! atomlab authentication server.
//!
//! Exposes Telegram Mini App and login Widget authentication over HTTP and
//! manages cookie-based session tokens.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod users;
