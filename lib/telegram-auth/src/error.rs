//! Error types for the telegram-auth crate.
//!
//! Verification and decoding failures are expected outcomes and are returned
//! as plain enums so callers can match on them:
//! - `MalformedInput`: a login payload could not be interpreted
//! - `AuthenticationError`: a login attempt was refused
//! - `TokenError`: a session token did not decode
//! - `AuthorizationError`: a strict gate refused a request
//!
//! Construction-time failures (`RegistryError`, `TokenConfigError`) are
//! reported through rootcause so the binary can attach startup context.

use std::fmt;

/// Reasons a login payload cannot be interpreted at all.
///
/// Distinct from a signature mismatch: a malformed payload never reached the
/// point where a signature could be computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedInput {
    /// The payload was empty.
    Empty,
    /// The payload bytes are not valid UTF-8.
    NotUtf8,
    /// The payload has no `hash` field, or the field is empty.
    MissingHash,
    /// The payload could not be parsed in the expected encoding.
    Unparsable { reason: String },
    /// A field held an object, array, or null where a scalar was expected.
    NonScalarField { field: String },
}

impl fmt::Display for MalformedInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "payload is empty"),
            Self::NotUtf8 => write!(f, "payload is not valid UTF-8"),
            Self::MissingHash => write!(f, "payload has no hash field"),
            Self::Unparsable { reason } => write!(f, "payload could not be parsed: {reason}"),
            Self::NonScalarField { field } => {
                write!(f, "field '{field}' is not a scalar value")
            }
        }
    }
}

impl std::error::Error for MalformedInput {}

/// Errors from a login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    /// The payload is malformed.
    MalformedInput(MalformedInput),
    /// No bot is registered under the requested name.
    UnknownBot { name: String },
    /// The declared client type is not one we recognize.
    InvalidClientType { declared: String },
    /// The signature was computed and did not match the claimed hash.
    SignatureMismatch { bot: String },
    /// The payload verified but does not describe a usable identity.
    InvalidPrincipal { reason: String },
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedInput(inner) => write!(f, "malformed login payload: {inner}"),
            Self::UnknownBot { name } => write!(f, "bot '{name}' not found"),
            Self::InvalidClientType { declared } => {
                write!(f, "invalid client type: '{declared}'")
            }
            Self::SignatureMismatch { bot } => {
                write!(f, "signature mismatch for bot '{bot}'")
            }
            Self::InvalidPrincipal { reason } => write!(f, "invalid user data: {reason}"),
        }
    }
}

impl std::error::Error for AuthenticationError {}

impl From<MalformedInput> for AuthenticationError {
    fn from(err: MalformedInput) -> Self {
        Self::MalformedInput(err)
    }
}

/// Errors from decoding a session token.
///
/// The two variants stay distinct so the HTTP layer can attach an
/// "expired" hint, even though both are authorization failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Bad structure, bad signature, wrong algorithm, or a missing claim.
    Invalid { reason: String },
    /// Structurally valid and correctly signed, but past its expiry.
    Expired,
}

impl TokenError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }

    /// Returns true for the expired variant.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired)
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid { reason } => write!(f, "invalid token: {reason}"),
            Self::Expired => write!(f, "token has expired"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Errors from a strict authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// No usable credential. `cause` is `None` when no credential was sent.
    Unauthorized { cause: Option<TokenError> },
}

impl AuthorizationError {
    /// Returns true when the credential was rejected only because it expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        match self {
            Self::Unauthorized { cause } => cause.as_ref().is_some_and(TokenError::is_expired),
        }
    }
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized { cause: None } => write!(f, "unauthorized: no credential"),
            Self::Unauthorized { cause: Some(cause) } => write!(f, "unauthorized: {cause}"),
        }
    }
}

impl std::error::Error for AuthorizationError {}

/// Errors assembling the bot registry at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The secret store has no secret for a configured bot.
    MissingSecret { bot: String },
    /// The secret store returned an empty secret.
    EmptySecret { bot: String },
    /// Two descriptors share a logical name.
    DuplicateBot { name: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSecret { bot } => write!(f, "no secret configured for bot '{bot}'"),
            Self::EmptySecret { bot } => write!(f, "secret for bot '{bot}' is empty"),
            Self::DuplicateBot { name } => write!(f, "bot '{name}' is configured twice"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Errors configuring the session token service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenConfigError {
    /// The signing secret is empty.
    EmptySecret,
    /// The algorithm name is not a supported HMAC variant.
    UnsupportedAlgorithm { name: String },
    /// The token lifetime must be at least one second.
    NonPositiveLifetime { seconds: i64 },
}

impl fmt::Display for TokenConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySecret => write!(f, "token signing secret is empty"),
            Self::UnsupportedAlgorithm { name } => {
                write!(f, "unsupported token algorithm: '{name}'")
            }
            Self::NonPositiveLifetime { seconds } => {
                write!(f, "token lifetime must be positive, got {seconds}s")
            }
        }
    }
}

impl std::error::Error for TokenConfigError {}
