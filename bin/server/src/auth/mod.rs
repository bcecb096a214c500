//! Telegram login and session handling for the HTTP surface.
//!
//! A client logs in by posting a Telegram-signed payload to
//! `/auth/{bot_name}`. On success the server sets an HTTP-only cookie
//! holding a signed session token; later requests are authenticated by
//! decoding that cookie, with no server-side session storage.
//!
//! Logout only clears the cookie. A copied token stays valid until it
//! expires, so token lifetimes are kept short.

pub mod middleware;
pub mod routes;

use crate::config::SessionConfig;
use crate::users::UserDirectory;
use atomlab_telegram_auth::{AuthorizationGate, ClientDispatcher, SessionTokenService};
use std::sync::Arc;

pub use middleware::{OptionalAuth, RequireAuth};

/// Shared application state.
pub struct AppState {
    /// Verifies login payloads against the bot registry.
    pub dispatcher: ClientDispatcher,
    /// Issues session tokens.
    pub tokens: Arc<SessionTokenService>,
    /// Classifies session cookies.
    pub gate: AuthorizationGate,
    /// Maps Telegram accounts to internal users.
    pub users: Arc<dyn UserDirectory>,
    /// Session cookie configuration.
    pub session_config: SessionConfig,
    /// Target of the legacy `POST /auth` redirect.
    pub default_bot: String,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        dispatcher: ClientDispatcher,
        tokens: Arc<SessionTokenService>,
        users: Arc<dyn UserDirectory>,
        session_config: SessionConfig,
        default_bot: String,
    ) -> Self {
        let gate = AuthorizationGate::new(Arc::clone(&tokens));
        Self {
            dispatcher,
            tokens,
            gate,
            users,
            session_config,
            default_bot,
        }
    }
}
