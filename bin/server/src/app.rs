//! HTTP routing.

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::{AppState, routes};

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Login
        .route("/auth", post(routes::legacy_login))
        .route("/auth/{bot_name}", post(routes::login))
        .route("/auth/logout", post(routes::logout))
        .route("/auth/session", get(routes::session_status))
        // Mini App entry
        .route("/apps/{bot_name}", get(routes::app_landing))
        // API
        .route("/api/v2/users/me", get(routes::current_user))
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
