//! Telegram login signature verification.
//!
//! Telegram signs login data in two ways depending on the client:
//!
//! - **Mini App** launch parameters arrive URL-query-encoded. The signing key
//!   is `HMAC-SHA256(key = "WebAppData", message = bot_token)`.
//! - **Login Widget** data arrives as a flat JSON object. The signing key is
//!   `SHA256(bot_token)`.
//!
//! Both schemes sign the same canonical string: every field except `hash`,
//! sorted by key, rendered as `key=value` and joined with `\n`. The claimed
//! `hash` is the lowercase hex `HMAC-SHA256(signing_key, canonical_string)`.
//!
//! Every function here is pure. Parse failures come back as
//! [`MalformedInput`]; a well-formed payload whose hash does not match yields
//! `Ok(false)`.

use crate::error::MalformedInput;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Name of the field carrying the claimed signature.
pub const HASH_FIELD: &str = "hash";

/// HMAC key used to derive Mini App signing keys.
const WEB_APP_DATA: &[u8] = b"WebAppData";

/// A parsed login payload, split into signed fields and the claimed hash.
///
/// Fields are held in a `BTreeMap`, so iteration order is the byte-wise key
/// order the canonical string requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPayload {
    fields: BTreeMap<String, String>,
    hash: String,
}

impl SignedPayload {
    /// Splits a field map into signed fields and the claimed hash.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedInput::MissingHash`] when there is no non-empty
    /// `hash` field.
    pub fn from_fields(mut fields: BTreeMap<String, String>) -> Result<Self, MalformedInput> {
        let hash = fields
            .remove(HASH_FIELD)
            .filter(|h| !h.is_empty())
            .ok_or(MalformedInput::MissingHash)?;
        Ok(Self { fields, hash })
    }

    /// Returns the signed fields (everything but `hash`).
    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Returns a single signed field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Returns the hash the client claims.
    #[must_use]
    pub fn claimed_hash(&self) -> &str {
        &self.hash
    }

    /// Builds the canonical string that Telegram signed.
    #[must_use]
    pub fn canonical_string(&self) -> String {
        canonical_string(&self.fields)
    }
}

/// Renders fields as sorted `key=value` lines joined by `\n`.
///
/// The `hash` field is skipped if present. There is no trailing newline, and
/// an empty map yields an empty string.
#[must_use]
pub fn canonical_string(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .filter(|(key, _)| key.as_str() != HASH_FIELD)
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn payload_text(payload: &[u8]) -> Result<&str, MalformedInput> {
    if payload.is_empty() {
        return Err(MalformedInput::Empty);
    }
    let text = std::str::from_utf8(payload).map_err(|_| MalformedInput::NotUtf8)?;
    if text.trim().is_empty() {
        return Err(MalformedInput::Empty);
    }
    Ok(text)
}

fn parse_form_fields(text: &str) -> BTreeMap<String, String> {
    // Later duplicates overwrite earlier ones.
    url::form_urlencoded::parse(text.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

/// Parses Mini App launch parameters (`key=value&...`, percent-encoded).
///
/// # Errors
///
/// Returns [`MalformedInput`] for empty or non-UTF-8 payloads and for
/// payloads without a `hash` field.
pub fn parse_mini_app(payload: &[u8]) -> Result<SignedPayload, MalformedInput> {
    let text = payload_text(payload)?;
    SignedPayload::from_fields(parse_form_fields(text))
}

/// Parses Login Widget data.
///
/// The widget posts a flat JSON object. Scalar values are rendered the way
/// they appear on the wire (`12345`, `true`, `"name"` becomes `name`). A
/// payload that is not a JSON object is read as form-encoded pairs, which is
/// how the widget's redirect flow delivers the same fields.
///
/// # Errors
///
/// Returns [`MalformedInput`] for empty, non-UTF-8, unparsable, or nested
/// payloads and for payloads without a `hash` field.
pub fn parse_widget(payload: &[u8]) -> Result<SignedPayload, MalformedInput> {
    let text = payload_text(payload)?;
    if !text.trim_start().starts_with('{') {
        return SignedPayload::from_fields(parse_form_fields(text));
    }

    let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(text)
        .map_err(|e| MalformedInput::Unparsable {
            reason: e.to_string(),
        })?;

    let mut fields = BTreeMap::new();
    for (key, value) in object {
        let rendered = match value {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Null
            | serde_json::Value::Array(_)
            | serde_json::Value::Object(_) => {
                return Err(MalformedInput::NonScalarField { field: key });
            }
        };
        fields.insert(key, rendered);
    }
    SignedPayload::from_fields(fields)
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> [u8; 32] {
    let mut mac =
        HmacSha256::new_from_slice(key).expect("HMAC-SHA256 accepts keys of any length");
    mac.update(message);
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&mac.finalize().into_bytes());
    digest
}

/// Derives the Mini App signing key: `HMAC-SHA256("WebAppData", bot_token)`.
#[must_use]
pub fn mini_app_signing_key(bot_token: &str) -> [u8; 32] {
    hmac_sha256(WEB_APP_DATA, bot_token.as_bytes())
}

/// Derives the Login Widget signing key: `SHA256(bot_token)`.
#[must_use]
pub fn widget_signing_key(bot_token: &str) -> [u8; 32] {
    let mut key = [0u8; 32];
    key.copy_from_slice(&Sha256::digest(bot_token.as_bytes()));
    key
}

/// Computes the lowercase hex signature of a canonical string.
#[must_use]
pub fn sign_canonical(signing_key: &[u8], canonical: &str) -> String {
    hex::encode(hmac_sha256(signing_key, canonical.as_bytes()))
}

/// Computes the hash Telegram would attach to Mini App fields.
#[must_use]
pub fn sign_mini_app(fields: &BTreeMap<String, String>, bot_token: &str) -> String {
    sign_canonical(&mini_app_signing_key(bot_token), &canonical_string(fields))
}

/// Computes the hash Telegram would attach to Login Widget fields.
#[must_use]
pub fn sign_widget(fields: &BTreeMap<String, String>, bot_token: &str) -> String {
    sign_canonical(&widget_signing_key(bot_token), &canonical_string(fields))
}

/// Compares two hex signatures without short-circuiting on content.
#[must_use]
pub fn signatures_match(computed: &str, claimed: &str) -> bool {
    computed.as_bytes().ct_eq(claimed.as_bytes()).into()
}

fn verify_with_key(payload: &SignedPayload, signing_key: &[u8]) -> bool {
    let computed = sign_canonical(signing_key, &payload.canonical_string());
    signatures_match(&computed, payload.claimed_hash())
}

/// Verifies an already-parsed Mini App payload.
#[must_use]
pub fn verify_mini_app_payload(payload: &SignedPayload, bot_token: &str) -> bool {
    verify_with_key(payload, &mini_app_signing_key(bot_token))
}

/// Verifies an already-parsed Login Widget payload.
#[must_use]
pub fn verify_widget_payload(payload: &SignedPayload, bot_token: &str) -> bool {
    verify_with_key(payload, &widget_signing_key(bot_token))
}

/// Verifies raw Mini App launch parameters against a bot token.
///
/// # Errors
///
/// Returns [`MalformedInput`] when the payload cannot be parsed or has no
/// hash. A parsed payload with the wrong hash yields `Ok(false)`.
pub fn verify_mini_app(payload: &[u8], bot_token: &str) -> Result<bool, MalformedInput> {
    let parsed = parse_mini_app(payload)?;
    Ok(verify_mini_app_payload(&parsed, bot_token))
}

/// Verifies raw Login Widget data against a bot token.
///
/// # Errors
///
/// Returns [`MalformedInput`] when the payload cannot be parsed or has no
/// hash. A parsed payload with the wrong hash yields `Ok(false)`.
pub fn verify_widget(payload: &[u8], bot_token: &str) -> Result<bool, MalformedInput> {
    let parsed = parse_widget(payload)?;
    Ok(verify_widget_payload(&parsed, bot_token))
}
