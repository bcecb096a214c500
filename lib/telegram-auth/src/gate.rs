//! Strict and soft authorization over session tokens.
//!
//! Both shapes read the same credential and run the same decode. They differ
//! only in what a failure looks like: the strict path returns
//! [`AuthorizationError`], the soft path returns `None`.

use crate::error::{AuthorizationError, TokenError};
use crate::token::{Claims, SessionTokenService};
use std::sync::Arc;
use tracing::debug;

/// Result of inspecting a request's credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    /// A valid token was presented.
    Authorized(Claims),
    /// No credential was presented.
    Unauthenticated,
    /// A credential was presented and did not decode.
    Rejected(TokenError),
}

impl AuthorizationOutcome {
    /// Returns the authenticated subject, if any.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::Authorized(claims) => Some(&claims.sub),
            Self::Unauthenticated | Self::Rejected(_) => None,
        }
    }

    /// Maps the outcome to the optional-auth shape.
    #[must_use]
    pub fn into_soft(self) -> Option<Claims> {
        match self {
            Self::Authorized(claims) => Some(claims),
            Self::Unauthenticated => None,
            Self::Rejected(e) => {
                debug!(error = %e, "ignoring unusable session credential");
                None
            }
        }
    }

    /// Maps the outcome to the required-auth shape.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError::Unauthorized`] unless the outcome is
    /// [`Authorized`](Self::Authorized).
    pub fn into_strict(self) -> Result<Claims, AuthorizationError> {
        match self {
            Self::Authorized(claims) => Ok(claims),
            Self::Unauthenticated => Err(AuthorizationError::Unauthorized { cause: None }),
            Self::Rejected(e) => Err(AuthorizationError::Unauthorized { cause: Some(e) }),
        }
    }
}

/// Adapts [`SessionTokenService`] into strict and soft checks.
#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    tokens: Arc<SessionTokenService>,
}

impl AuthorizationGate {
    #[must_use]
    pub fn new(tokens: Arc<SessionTokenService>) -> Self {
        Self { tokens }
    }

    /// Classifies a credential against the current time.
    #[must_use]
    pub fn outcome(&self, credential: Option<&str>) -> AuthorizationOutcome {
        classify(credential, |token| self.tokens.decode(token))
    }

    /// Classifies a credential as of `now` (epoch seconds).
    #[must_use]
    pub fn outcome_at(&self, credential: Option<&str>, now: i64) -> AuthorizationOutcome {
        classify(credential, |token| self.tokens.decode_at(token, now))
    }

    /// Returns the subject for a valid credential and `None` otherwise.
    #[must_use]
    pub fn soft_resolve(&self, credential: Option<&str>) -> Option<String> {
        self.outcome(credential).into_soft().map(|claims| claims.sub)
    }

    /// Soft resolution as of `now`.
    #[must_use]
    pub fn soft_resolve_at(&self, credential: Option<&str>, now: i64) -> Option<String> {
        self.outcome_at(credential, now).into_soft().map(|claims| claims.sub)
    }

    /// Returns the subject for a valid credential.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError::Unauthorized`] when the credential is
    /// absent, invalid, or expired.
    pub fn strict_resolve(&self, credential: Option<&str>) -> Result<String, AuthorizationError> {
        self.outcome(credential).into_strict().map(|claims| claims.sub)
    }

    /// Strict resolution as of `now`.
    ///
    /// # Errors
    ///
    /// See [`strict_resolve`](Self::strict_resolve).
    pub fn strict_resolve_at(
        &self,
        credential: Option<&str>,
        now: i64,
    ) -> Result<String, AuthorizationError> {
        self.outcome_at(credential, now).into_strict().map(|claims| claims.sub)
    }

    /// Like [`strict_resolve`](Self::strict_resolve) but keeps every claim.
    ///
    /// # Errors
    ///
    /// See [`strict_resolve`](Self::strict_resolve).
    pub fn strict_claims(&self, credential: Option<&str>) -> Result<Claims, AuthorizationError> {
        self.outcome(credential).into_strict()
    }
}

fn classify(
    credential: Option<&str>,
    decode: impl FnOnce(&str) -> Result<Claims, TokenError>,
) -> AuthorizationOutcome {
    // An empty cookie value is the same as no cookie.
    match credential.filter(|token| !token.is_empty()) {
        None => AuthorizationOutcome::Unauthenticated,
        Some(token) => match decode(token) {
            Ok(claims) => AuthorizationOutcome::Authorized(claims),
            Err(e) => AuthorizationOutcome::Rejected(e),
        },
    }
}
