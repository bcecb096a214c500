//! Bot descriptors, secrets, and the registry that pairs them.
//!
//! The registry is assembled once at startup from configuration plus a
//! [`SecretStore`] and is read-only afterwards, so it can be shared freely
//! between request handlers.

use crate::error::{AuthenticationError, RegistryError};
use atomlab_core::Result;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Static description of a bot users can log in through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotDescriptor {
    /// Name used in request paths (e.g. `bot1`).
    logical_name: String,
    /// The bot's Telegram username (e.g. `atomlab_bot`).
    external_client_id: String,
    /// Where the client goes after a successful login.
    default_redirect: String,
}

impl BotDescriptor {
    /// Creates a new descriptor.
    #[must_use]
    pub fn new(
        logical_name: impl Into<String>,
        external_client_id: impl Into<String>,
        default_redirect: impl Into<String>,
    ) -> Self {
        Self {
            logical_name: logical_name.into(),
            external_client_id: external_client_id.into(),
            default_redirect: default_redirect.into(),
        }
    }

    /// Returns the logical name used in request paths.
    #[must_use]
    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    /// Returns the bot's Telegram username.
    #[must_use]
    pub fn external_client_id(&self) -> &str {
        &self.external_client_id
    }

    /// Returns the post-login redirect target.
    #[must_use]
    pub fn default_redirect(&self) -> &str {
        &self.default_redirect
    }
}

/// A bot token used as HMAC key material.
///
/// Redacted in `Debug` output and never serialized.
pub struct BotSecret(SecretString);

impl BotSecret {
    /// Wraps a raw bot token.
    #[must_use]
    pub fn new(token: &str) -> Self {
        Self(SecretString::from(token.to_string()))
    }

    /// Returns the raw token for key derivation.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }
}

impl From<&SecretString> for BotSecret {
    fn from(secret: &SecretString) -> Self {
        Self::new(secret.expose_secret())
    }
}

impl fmt::Debug for BotSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BotSecret([REDACTED])")
    }
}

/// Source of bot tokens.
///
/// Implemented by the configuration layer in production and by plain maps in
/// tests.
pub trait SecretStore {
    /// Returns the token for the given bot, if one is configured.
    fn bot_secret(&self, bot: &BotDescriptor) -> Option<BotSecret>;
}

/// Tokens keyed by logical bot name.
impl SecretStore for HashMap<String, SecretString> {
    fn bot_secret(&self, bot: &BotDescriptor) -> Option<BotSecret> {
        self.get(bot.logical_name()).map(BotSecret::from)
    }
}

#[derive(Debug)]
struct RegisteredBot {
    descriptor: BotDescriptor,
    secret: BotSecret,
}

/// Immutable map from logical bot name to descriptor and secret.
#[derive(Debug)]
pub struct BotRegistry {
    bots: HashMap<String, RegisteredBot>,
}

impl BotRegistry {
    /// Builds a registry, resolving every bot's secret up front.
    ///
    /// # Errors
    ///
    /// Fails if a logical name repeats or if any bot lacks a non-empty
    /// secret. A bot without a secret could never verify a login, so it is
    /// refused at startup instead of failing every request.
    pub fn new<S>(
        descriptors: impl IntoIterator<Item = BotDescriptor>,
        store: &S,
    ) -> Result<Self, RegistryError>
    where
        S: SecretStore + ?Sized,
    {
        let mut bots = HashMap::new();
        for descriptor in descriptors {
            let name = descriptor.logical_name().to_string();
            if bots.contains_key(&name) {
                return Err(RegistryError::DuplicateBot { name }.into());
            }
            let secret = store
                .bot_secret(&descriptor)
                .ok_or_else(|| RegistryError::MissingSecret { bot: name.clone() })?;
            if secret.is_empty() {
                return Err(RegistryError::EmptySecret { bot: name }.into());
            }
            bots.insert(name, RegisteredBot { descriptor, secret });
        }
        tracing::debug!(bots = bots.len(), "bot registry assembled");
        Ok(Self { bots })
    }

    /// Looks up a bot by logical name.
    ///
    /// # Errors
    ///
    /// Returns [`AuthenticationError::UnknownBot`] if no such bot exists.
    pub fn resolve(&self, name: &str) -> std::result::Result<&BotDescriptor, AuthenticationError> {
        self.bots
            .get(name)
            .map(|bot| &bot.descriptor)
            .ok_or_else(|| AuthenticationError::UnknownBot {
                name: name.to_string(),
            })
    }

    pub(crate) fn secret(&self, name: &str) -> Option<&BotSecret> {
        self.bots.get(name).map(|bot| &bot.secret)
    }

    /// Iterates over every registered descriptor.
    pub fn descriptors(&self) -> impl Iterator<Item = &BotDescriptor> {
        self.bots.values().map(|bot| &bot.descriptor)
    }

    /// Returns the number of registered bots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bots.len()
    }

    /// Returns true if no bots are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptors() -> Vec<BotDescriptor> {
        vec![
            BotDescriptor::new("bot1", "atomlab_bot", "/profile"),
            BotDescriptor::new("bot2", "mininwork_bot", "/affirmations"),
        ]
    }

    fn secrets() -> HashMap<String, SecretString> {
        HashMap::from([
            ("bot1".to_string(), SecretString::from("1:aaa".to_string())),
            ("bot2".to_string(), SecretString::from("2:bbb".to_string())),
        ])
    }

    #[test]
    fn resolves_registered_bots() {
        let registry = BotRegistry::new(descriptors(), &secrets()).expect("registry");
        let bot = registry.resolve("bot2").expect("bot2");
        assert_eq!(bot.external_client_id(), "mininwork_bot");
        assert_eq!(bot.default_redirect(), "/affirmations");
        assert_eq!(registry.secret("bot1").map(BotSecret::expose), Some("1:aaa"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.descriptors().count(), 2);
    }

    #[test]
    fn unknown_bot_is_not_found() {
        let registry = BotRegistry::new(descriptors(), &secrets()).expect("registry");
        assert_eq!(
            registry.resolve("bot9"),
            Err(AuthenticationError::UnknownBot {
                name: "bot9".to_string()
            })
        );
        assert!(registry.secret("bot9").is_none());
    }

    #[test]
    fn missing_secret_fails_assembly() {
        let mut store = secrets();
        store.remove("bot2");
        let report = BotRegistry::new(descriptors(), &store).unwrap_err();
        assert!(report.to_string().contains("bot2"));
    }

    #[test]
    fn empty_secret_fails_assembly() {
        let mut store = secrets();
        store.insert("bot1".to_string(), SecretString::from(String::new()));
        assert!(BotRegistry::new(descriptors(), &store).is_err());
    }

    #[test]
    fn duplicate_names_fail_assembly() {
        let mut bots = descriptors();
        bots.push(BotDescriptor::new("bot1", "other_bot", "/"));
        let report = BotRegistry::new(bots, &secrets()).unwrap_err();
        assert!(report.to_string().contains("bot1"));
    }

    #[test]
    fn empty_registry_is_allowed() {
        let registry = BotRegistry::new(Vec::new(), &secrets()).expect("registry");
        assert!(registry.is_empty());
    }

    #[test]
    fn secret_debug_is_redacted() {
        let secret = BotSecret::new("1:aaa");
        assert!(!format!("{secret:?}").contains("aaa"));
    }

    #[test]
    fn descriptor_deserializes_from_config_shape() {
        let json = r#"{
            "logical_name": "bot3",
            "external_client_id": "test_bot",
            "default_redirect": "/projects"
        }"#;
        let descriptor: BotDescriptor = serde_json::from_str(json).expect("deserialize");
        assert_eq!(descriptor.logical_name(), "bot3");
    }
}
