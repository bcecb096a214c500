//! Telegram login verification and session tokens for atomlab.
//!
//! Two Telegram integrations sign login payloads differently: Mini Apps use
//! an HMAC-derived key over a URL-encoded payload, the login Widget uses a
//! SHA-256-derived key over a flat JSON object. This crate verifies both,
//! issues signed session tokens for verified users, and classifies incoming
//! session credentials for strict and optional authentication.
//!
//! Nothing here performs I/O. Every component is built once at startup from
//! configuration and shared read-only between requests.

mod bot;
mod client;
mod dispatcher;
mod error;
mod gate;
mod principal;
pub mod signature;
mod token;

pub use bot::{BotDescriptor, BotRegistry, BotSecret, SecretStore};
pub use client::{CLIENT_SOURCE_HEADER, ClientType};
pub use dispatcher::{ClientDispatcher, VerifiedLogin};
pub use error::{
    AuthenticationError, AuthorizationError, MalformedInput, RegistryError, TokenConfigError,
    TokenError,
};
pub use gate::{AuthorizationGate, AuthorizationOutcome};
pub use principal::Principal;
pub use signature::SignedPayload;
pub use token::{
    Claims, DEFAULT_LIFETIME_SECONDS, SessionCredential, SessionTokenService, SigningAlgorithm,
    TOKEN_ISSUER, TokenConfig,
};
