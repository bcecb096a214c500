//! Authentication routes for login, session inspection, and logout.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use atomlab_core::UserId;
use atomlab_telegram_auth::{AuthenticationError, CLIENT_SOURCE_HEADER, ClientType};
use serde::Serialize;
use std::sync::Arc;
use time::Duration as TimeDuration;

use super::{AppState, OptionalAuth, RequireAuth};
use crate::error::ApiError;
use crate::users::UserProfile;

/// Redirect used when a bot has no usable default.
const FALLBACK_REDIRECT: &str = "/profile";

/// Body returned after a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub redirect_url: String,
}

/// Body returned by the Mini App landing for anonymous visitors.
#[derive(Debug, Serialize)]
pub struct AppLanding {
    pub bot: String,
}

/// Body returned by the session probe.
#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub authenticated: bool,
    pub user_id: Option<String>,
}

/// Body returned for the current user.
#[derive(Debug, Serialize)]
pub struct CurrentUser {
    pub user_id: String,
    pub jti: String,
    pub expires_at: i64,
    pub profile: Option<UserProfile>,
}

/// Verifies a Telegram login payload and starts a session.
///
/// The client type comes from the `X-Client-Source` header and the raw body
/// is the signed payload, passed through untouched.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Path(bot_name): Path<String>,
    headers: HeaderMap,
    jar: CookieJar,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let client = declared_client(&headers)?;
    let login = state.dispatcher.authenticate(client, &bot_name, &body)?;

    let user_id = state.users.create_or_fetch(&login.principal).await?;
    let credential = state.tokens.issue(&user_id.to_string());
    tracing::info!(
        user_id = %user_id,
        jti = %credential.claims.jti,
        bot = %bot_name,
        client = %client,
        "issued session token"
    );

    let lifetime = state.tokens.lifetime_seconds();
    let secure = state.session_config.secure_cookies;
    // Mini Apps are framed cross-site; browsers drop SameSite=None cookies
    // that are not Secure.
    let same_site = if secure { SameSite::None } else { SameSite::Lax };
    let session_cookie = Cookie::build((state.session_config.cookie_name.clone(), credential.token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(same_site)
        .max_age(TimeDuration::seconds(lifetime));

    let redirect_url = non_empty_redirect(login.bot.default_redirect()).to_string();
    Ok((jar.add(session_cookie), Json(LoginResponse { redirect_url })))
}

/// Legacy login entry point; forwards to the default bot, keeping the
/// method and body.
pub async fn legacy_login(State(state): State<Arc<AppState>>) -> Redirect {
    Redirect::permanent(&format!("/auth/{}", state.default_bot))
}

/// Mini App landing page.
///
/// Logged-in visitors are sent straight to the bot's redirect target;
/// anonymous visitors get the bot's Telegram username for the login widget.
pub async fn app_landing(
    State(state): State<Arc<AppState>>,
    Path(bot_name): Path<String>,
    OptionalAuth(claims): OptionalAuth,
) -> Result<Response, ApiError> {
    if let Some(claims) = claims {
        let target = state
            .dispatcher
            .resolve(&bot_name)
            .map_or(FALLBACK_REDIRECT, |bot| non_empty_redirect(bot.default_redirect()));
        tracing::debug!(user_id = %claims.sub, bot = %bot_name, "already logged in, redirecting");
        return Ok(Redirect::to(target).into_response());
    }

    let bot = state.dispatcher.resolve(&bot_name)?;
    Ok(Json(AppLanding {
        bot: bot.external_client_id().to_string(),
    })
    .into_response())
}

/// Reports whether the request carries a valid session.
pub async fn session_status(OptionalAuth(claims): OptionalAuth) -> Json<SessionStatus> {
    Json(SessionStatus {
        authenticated: claims.is_some(),
        user_id: claims.map(|claims| claims.sub),
    })
}

/// Returns the current user.
pub async fn current_user(
    State(state): State<Arc<AppState>>,
    RequireAuth(claims): RequireAuth,
) -> Result<Json<CurrentUser>, ApiError> {
    let profile = match claims.sub.parse::<UserId>() {
        Ok(id) => state.users.find(id).await?,
        Err(_) => None,
    };
    Ok(Json(CurrentUser {
        user_id: claims.sub,
        jti: claims.jti.to_string(),
        expires_at: claims.exp,
        profile,
    }))
}

/// Logs out by expiring the session cookie.
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    let remove_session = Cookie::build((state.session_config.cookie_name.clone(), ""))
        .path("/")
        .max_age(TimeDuration::ZERO);

    (jar.add(remove_session), StatusCode::NO_CONTENT)
}

/// Liveness probe.
pub async fn health() -> &'static str {
    "ok"
}

fn declared_client(headers: &HeaderMap) -> Result<ClientType, AuthenticationError> {
    let declared = headers
        .get(CLIENT_SOURCE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    declared.parse()
}

fn non_empty_redirect(redirect: &str) -> &str {
    if redirect.is_empty() {
        FALLBACK_REDIRECT
    } else {
        redirect
    }
}
