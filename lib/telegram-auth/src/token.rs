//! Session tokens.
//!
//! Tokens are compact JWS strings (`header.payload.signature`, base64url
//! without padding) signed with an HMAC-SHA2 variant. The service is
//! stateless: issuing and decoding only touch the immutable signing secret,
//! so one instance can be shared across every request.

use crate::error::{TokenConfigError, TokenError};
use atomlab_core::Result;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha384, Sha512};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Value of the `iss` claim on every token we issue.
pub const TOKEN_ISSUER: &str = "mks-min.ru";

/// Default token lifetime in seconds.
pub const DEFAULT_LIFETIME_SECONDS: i64 = 3600;

/// HMAC algorithms a session token may be signed with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SigningAlgorithm {
    #[default]
    HS256,
    HS384,
    HS512,
}

impl SigningAlgorithm {
    /// Returns the JOSE `alg` name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
        }
    }

    fn sign(self, key: &[u8], message: &[u8]) -> Vec<u8> {
        match self {
            Self::HS256 => mac::<Hmac<Sha256>>(key, message).finalize().into_bytes().to_vec(),
            Self::HS384 => mac::<Hmac<Sha384>>(key, message).finalize().into_bytes().to_vec(),
            Self::HS512 => mac::<Hmac<Sha512>>(key, message).finalize().into_bytes().to_vec(),
        }
    }

    /// Constant-time check of `tag` against the MAC of `message`.
    fn verify(self, key: &[u8], message: &[u8], tag: &[u8]) -> bool {
        match self {
            Self::HS256 => mac::<Hmac<Sha256>>(key, message).verify_slice(tag).is_ok(),
            Self::HS384 => mac::<Hmac<Sha384>>(key, message).verify_slice(tag).is_ok(),
            Self::HS512 => mac::<Hmac<Sha512>>(key, message).verify_slice(tag).is_ok(),
        }
    }
}

fn mac<M: Mac + KeyInit>(key: &[u8], message: &[u8]) -> M {
    let mut mac = <M as KeyInit>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(message);
    mac
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SigningAlgorithm {
    type Err = TokenConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "HS256" => Ok(Self::HS256),
            "HS384" => Ok(Self::HS384),
            "HS512" => Ok(Self::HS512),
            other => Err(TokenConfigError::UnsupportedAlgorithm {
                name: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for SigningAlgorithm {
    type Error = TokenConfigError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SigningAlgorithm> for String {
    fn from(algorithm: SigningAlgorithm) -> Self {
        algorithm.as_str().to_string()
    }
}

/// Settings for [`SessionTokenService`].
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Symmetric signing secret.
    pub secret: SecretString,
    /// HMAC variant used for signing and the only one accepted on decode.
    pub algorithm: SigningAlgorithm,
    /// Seconds between `iat` and `exp`.
    pub lifetime_seconds: i64,
}

impl TokenConfig {
    /// Creates a config with the default algorithm and lifetime.
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            algorithm: SigningAlgorithm::default(),
            lifetime_seconds: DEFAULT_LIFETIME_SECONDS,
        }
    }
}

/// The claims carried by a session token. All timestamps are epoch seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    /// Internal user id.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique token id.
    pub jti: Uuid,
}

impl Claims {
    /// Returns true if the token is expired at `now`. The expiry instant
    /// itself counts as expired.
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}

/// Claims as they arrive on the wire, before presence checks.
#[derive(Deserialize)]
struct RawClaims {
    iss: Option<String>,
    sub: Option<String>,
    iat: Option<i64>,
    exp: Option<i64>,
    jti: Option<Uuid>,
}

impl RawClaims {
    fn require(self) -> std::result::Result<Claims, TokenError> {
        let missing = |claim: &str| TokenError::invalid(format!("missing '{claim}' claim"));
        Ok(Claims {
            iss: self.iss.ok_or_else(|| missing("iss"))?,
            sub: self.sub.ok_or_else(|| missing("sub"))?,
            iat: self.iat.ok_or_else(|| missing("iat"))?,
            exp: self.exp.ok_or_else(|| missing("exp"))?,
            jti: self.jti.ok_or_else(|| missing("jti"))?,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// A freshly issued token together with its plaintext claims.
#[derive(Debug, Clone)]
pub struct SessionCredential {
    /// The opaque token string to hand to the client.
    pub token: String,
    pub claims: Claims,
}

/// Issues and decodes session tokens.
#[derive(Debug)]
pub struct SessionTokenService {
    secret: SecretString,
    algorithm: SigningAlgorithm,
    lifetime_seconds: i64,
}

impl SessionTokenService {
    /// Creates a service from validated settings.
    ///
    /// # Errors
    ///
    /// Fails if the secret is empty or the lifetime is not positive.
    pub fn new(config: TokenConfig) -> Result<Self, TokenConfigError> {
        if config.secret.expose_secret().is_empty() {
            return Err(TokenConfigError::EmptySecret.into());
        }
        if config.lifetime_seconds <= 0 {
            return Err(TokenConfigError::NonPositiveLifetime {
                seconds: config.lifetime_seconds,
            }
            .into());
        }
        Ok(Self {
            secret: config.secret,
            algorithm: config.algorithm,
            lifetime_seconds: config.lifetime_seconds,
        })
    }

    /// Returns the configured token lifetime in seconds.
    #[must_use]
    pub fn lifetime_seconds(&self) -> i64 {
        self.lifetime_seconds
    }

    /// Returns the configured signing algorithm.
    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    /// Issues a token for `subject`, valid from now.
    #[must_use]
    pub fn issue(&self, subject: &str) -> SessionCredential {
        self.issue_at(subject, now())
    }

    /// Issues a token as of `now` (epoch seconds).
    #[must_use]
    pub fn issue_at(&self, subject: &str, now: i64) -> SessionCredential {
        let claims = Claims {
            iss: TOKEN_ISSUER.to_string(),
            sub: subject.to_string(),
            iat: now,
            exp: now.saturating_add(self.lifetime_seconds),
            jti: Uuid::new_v4(),
        };
        let token = self.encode(&claims);
        SessionCredential { token, claims }
    }

    /// Decodes and validates a token against the current time.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Expired`] for a correctly signed token past its
    /// expiry, and [`TokenError::Invalid`] for anything else that fails.
    pub fn decode(&self, token: &str) -> std::result::Result<Claims, TokenError> {
        self.decode_at(token, now())
    }

    /// Decodes and validates a token as of `now` (epoch seconds).
    ///
    /// # Errors
    ///
    /// See [`decode`](Self::decode).
    pub fn decode_at(&self, token: &str, now: i64) -> std::result::Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::invalid("expected three segments"));
        };

        let header: Header = serde_json::from_slice(&base64_segment(header, "header")?)
            .map_err(|e| TokenError::invalid(format!("unreadable header: {e}")))?;
        if header.alg != self.algorithm.as_str() {
            return Err(TokenError::invalid(format!(
                "unexpected algorithm '{}'",
                header.alg
            )));
        }

        let tag = base64_segment(signature, "signature")?;
        let signing_input = &token[..token.len() - signature.len() - 1];
        if !self.algorithm.verify(self.key(), signing_input.as_bytes(), &tag) {
            return Err(TokenError::invalid("signature mismatch"));
        }

        let claims: RawClaims = serde_json::from_slice(&base64_segment(payload, "payload")?)
            .map_err(|e| TokenError::invalid(format!("unreadable claims: {e}")))?;
        let claims = claims.require()?;
        if claims.iss != TOKEN_ISSUER {
            return Err(TokenError::invalid(format!(
                "unexpected issuer '{}'",
                claims.iss
            )));
        }
        if claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn encode(&self, claims: &Claims) -> String {
        let header = Header {
            alg: self.algorithm.as_str().to_string(),
            typ: Some("JWT".to_string()),
        };
        let mut token = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(to_json(&header)),
            URL_SAFE_NO_PAD.encode(to_json(claims)),
        );
        let signature = self.algorithm.sign(self.key(), token.as_bytes());
        token.push('.');
        token.push_str(&URL_SAFE_NO_PAD.encode(signature));
        token
    }

    fn key(&self) -> &[u8] {
        self.secret.expose_secret().as_bytes()
    }
}

fn to_json<T: Serialize>(value: &T) -> Vec<u8> {
    // Plain structs of strings and integers always serialize.
    serde_json::to_vec(value).unwrap_or_default()
}

fn base64_segment(segment: &str, name: &str) -> std::result::Result<Vec<u8>, TokenError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| TokenError::invalid(format!("{name} is not base64url: {e}")))
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
