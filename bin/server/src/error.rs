//! HTTP mapping for domain errors.
//!
//! Response bodies are JSON `{"detail": ...}` with a user-safe message;
//! internal details only go to the log.

use crate::users::DirectoryError;
use atomlab_telegram_auth::{AuthenticationError, AuthorizationError};
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use rootcause::prelude::Report;
use serde_json::json;

/// Errors surfaced by route handlers.
#[derive(Debug)]
pub enum ApiError {
    /// A login attempt was refused.
    Authentication(AuthenticationError),
    /// A strict endpoint was called without a usable session.
    Unauthorized(AuthorizationError),
    /// The user directory failed.
    Directory(Report<DirectoryError>),
}

impl From<AuthenticationError> for ApiError {
    fn from(err: AuthenticationError) -> Self {
        Self::Authentication(err)
    }
}

impl From<AuthorizationError> for ApiError {
    fn from(err: AuthorizationError) -> Self {
        Self::Unauthorized(err)
    }
}

impl From<Report<DirectoryError>> for ApiError {
    fn from(err: Report<DirectoryError>) -> Self {
        Self::Directory(err)
    }
}

/// Status code for a refused login.
#[must_use]
pub fn authentication_status(err: &AuthenticationError) -> StatusCode {
    match err {
        AuthenticationError::MalformedInput(_)
        | AuthenticationError::InvalidClientType { .. }
        | AuthenticationError::InvalidPrincipal { .. } => StatusCode::BAD_REQUEST,
        AuthenticationError::UnknownBot { .. } => StatusCode::NOT_FOUND,
        AuthenticationError::SignatureMismatch { .. } => StatusCode::UNAUTHORIZED,
    }
}

/// Builds the 401 response for a failed strict check.
#[must_use]
pub fn unauthorized_response(err: &AuthorizationError) -> Response {
    let challenge = if err.is_expired() {
        r#"Bearer error="invalid_token", error_description="token expired""#
    } else {
        r#"Bearer error="invalid_token", error_description="invalid token""#
    };
    let mut response = (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "detail": "Could not validate credentials" })),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(challenge));
    response
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Authentication(err) => {
                let status = authentication_status(&err);
                let detail = match &err {
                    AuthenticationError::MalformedInput(_) => "Malformed login data".to_string(),
                    AuthenticationError::SignatureMismatch { .. } => {
                        "Invalid Telegram signature".to_string()
                    }
                    other => other.to_string(),
                };
                (status, Json(json!({ "detail": detail }))).into_response()
            }
            Self::Unauthorized(err) => unauthorized_response(&err),
            Self::Directory(report) => {
                tracing::error!(error = %report, "user directory failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atomlab_telegram_auth::{MalformedInput, TokenError};

    #[test]
    fn authentication_errors_map_to_status_codes() {
        let cases = [
            (
                AuthenticationError::MalformedInput(MalformedInput::Empty),
                StatusCode::BAD_REQUEST,
            ),
            (
                AuthenticationError::InvalidClientType {
                    declared: "x".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                AuthenticationError::UnknownBot {
                    name: "bot9".to_string(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                AuthenticationError::SignatureMismatch {
                    bot: "bot1".to_string(),
                },
                StatusCode::UNAUTHORIZED,
            ),
            (
                AuthenticationError::InvalidPrincipal {
                    reason: "no id".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn expired_token_gets_expired_hint() {
        let response = ApiError::from(AuthorizationError::Unauthorized {
            cause: Some(TokenError::Expired),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let challenge = response.headers()[header::WWW_AUTHENTICATE]
            .to_str()
            .expect("ascii");
        assert!(challenge.contains("token expired"));
    }

    #[test]
    fn missing_token_gets_invalid_hint() {
        let response = unauthorized_response(&AuthorizationError::Unauthorized { cause: None });
        let challenge = response.headers()[header::WWW_AUTHENTICATE]
            .to_str()
            .expect("ascii");
        assert!(challenge.starts_with("Bearer"));
        assert!(challenge.contains("invalid token"));
    }

    #[test]
    fn directory_failure_is_internal_error() {
        let report: Report<DirectoryError> = DirectoryError::Unavailable {
            details: "connection refused".to_string(),
        }
        .into();
        let response = ApiError::from(report).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
