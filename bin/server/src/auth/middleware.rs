//! Authentication extractors for Axum.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use atomlab_telegram_auth::{AuthorizationError, AuthorizationOutcome, Claims};
use std::sync::Arc;

use super::AppState;
use crate::error::unauthorized_response;

/// Extractor for requiring an authenticated user.
///
/// Rejects with 401 and a `WWW-Authenticate` challenge when the session
/// cookie is absent, invalid, or expired.
pub struct RequireAuth(pub Claims);

impl<S> FromRequestParts<S> for RequireAuth
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let claims = session_outcome(parts, state).into_strict()?;
        Ok(RequireAuth(claims))
    }
}

/// Extractor for optionally getting the authenticated user.
///
/// Returns None if the user is not authenticated. Never rejects.
pub struct OptionalAuth(pub Option<Claims>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(session_outcome(parts, state).into_soft()))
    }
}

/// Classifies the request's session cookie.
fn session_outcome<S>(parts: &Parts, state: &S) -> AuthorizationOutcome
where
    Arc<AppState>: FromRef<S>,
{
    let app_state = Arc::<AppState>::from_ref(state);
    let jar = CookieJar::from_headers(&parts.headers);
    let credential = jar.get(&app_state.session_config.cookie_name);
    app_state
        .gate
        .outcome(credential.map(|cookie| cookie.value()))
}

/// Rejection type for [`RequireAuth`].
#[derive(Debug)]
pub struct AuthRejection(pub AuthorizationError);

impl From<AuthorizationError> for AuthRejection {
    fn from(err: AuthorizationError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        tracing::debug!(error = %self.0, "rejecting unauthenticated request");
        unauthorized_response(&self.0)
    }
}
