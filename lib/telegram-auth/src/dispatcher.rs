//! Routes a login payload to the right verifier and secret.
//!
//! The secret is always looked up by the path-scoped bot name. The declared
//! client type only selects the algorithm, so a caller lying about its client
//! type can at most make its own signature fail.

use crate::bot::{BotDescriptor, BotRegistry};
use crate::client::ClientType;
use crate::error::AuthenticationError;
use crate::principal::Principal;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// A login payload that passed signature verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedLogin {
    /// The bot the user logged in through.
    pub bot: BotDescriptor,
    /// The client type the payload was verified as.
    pub client: ClientType,
    /// The Telegram identity carried by the payload.
    pub principal: Principal,
}

/// Verifies login payloads against the bot registry.
#[derive(Debug, Clone)]
pub struct ClientDispatcher {
    registry: Arc<BotRegistry>,
}

impl ClientDispatcher {
    /// Creates a dispatcher over a shared registry.
    #[must_use]
    pub fn new(registry: Arc<BotRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the underlying registry.
    #[must_use]
    pub fn registry(&self) -> &BotRegistry {
        &self.registry
    }

    /// Looks up a bot by logical name.
    ///
    /// # Errors
    ///
    /// Returns [`AuthenticationError::UnknownBot`] for unregistered names.
    pub fn resolve(&self, bot_name: &str) -> Result<&BotDescriptor, AuthenticationError> {
        self.registry.resolve(bot_name)
    }

    /// Checks a payload's signature.
    ///
    /// Returns `Ok(false)` on a well-formed payload with the wrong hash.
    ///
    /// # Errors
    ///
    /// Returns `UnknownBot` or `MalformedInput`.
    pub fn verify(
        &self,
        client: ClientType,
        bot_name: &str,
        payload: &[u8],
    ) -> Result<bool, AuthenticationError> {
        let secret = self.secret(bot_name)?;
        Ok(client.verify(payload, secret)?)
    }

    /// Like [`verify`](Self::verify), but parses the declared client type
    /// first.
    ///
    /// # Errors
    ///
    /// Returns `InvalidClientType`, `UnknownBot`, or `MalformedInput`.
    pub fn verify_declared(
        &self,
        declared: &str,
        bot_name: &str,
        payload: &[u8],
    ) -> Result<bool, AuthenticationError> {
        let client: ClientType = declared.parse()?;
        self.verify(client, bot_name, payload)
    }

    /// Verifies a payload and extracts the identity it carries.
    ///
    /// # Errors
    ///
    /// Returns `UnknownBot`, `MalformedInput`, `SignatureMismatch`, or
    /// `InvalidPrincipal`.
    #[instrument(skip(self, payload), fields(client = %client))]
    pub fn authenticate(
        &self,
        client: ClientType,
        bot_name: &str,
        payload: &[u8],
    ) -> Result<VerifiedLogin, AuthenticationError> {
        let bot = self.registry.resolve(bot_name)?;
        let secret = self.secret(bot_name)?;
        let parsed = client.parse(payload).inspect_err(|e| {
            debug!(error = %e, "login payload is malformed");
        })?;

        if !client.verify_parsed(&parsed, secret) {
            warn!(bot = bot_name, client = %client, "login signature mismatch");
            return Err(AuthenticationError::SignatureMismatch {
                bot: bot_name.to_string(),
            });
        }

        let principal = Principal::from_payload(client, &parsed)?;
        debug!(telegram_id = %principal.external_id, "login payload verified");
        Ok(VerifiedLogin {
            bot: bot.clone(),
            client,
            principal,
        })
    }

    fn secret(&self, bot_name: &str) -> Result<&str, AuthenticationError> {
        self.registry
            .secret(bot_name)
            .map(|secret| secret.expose())
            .ok_or_else(|| AuthenticationError::UnknownBot {
                name: bot_name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MalformedInput;
    use crate::signature::{sign_mini_app, sign_widget};
    use atomlab_core::TelegramId;
    use secrecy::SecretString;
    use std::collections::{BTreeMap, HashMap};

    const BOT1_TOKEN: &str = "12345:ABCabc";
    const BOT2_TOKEN: &str = "67890:XYZxyz";

    fn dispatcher() -> ClientDispatcher {
        let store = HashMap::from([
            ("bot1".to_string(), SecretString::from(BOT1_TOKEN.to_string())),
            ("bot2".to_string(), SecretString::from(BOT2_TOKEN.to_string())),
        ]);
        let registry = BotRegistry::new(
            vec![
                BotDescriptor::new("bot1", "atomlab_bot", "/profile"),
                BotDescriptor::new("bot2", "mininwork_bot", "/affirmations"),
            ],
            &store,
        )
        .expect("registry");
        ClientDispatcher::new(Arc::new(registry))
    }

    fn mini_app_fields() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("auth_date".to_string(), "1700000000".to_string()),
            ("query_id".to_string(), "AA".to_string()),
            ("user".to_string(), r#"{"id":5,"first_name":"Ann"}"#.to_string()),
        ])
    }

    fn mini_app_body(token: &str) -> String {
        let fields = mini_app_fields();
        let hash = sign_mini_app(&fields, token);
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields.iter())
            .append_pair("hash", &hash)
            .finish()
    }

    #[test]
    fn verifies_with_the_path_scoped_secret() {
        let dispatcher = dispatcher();
        let body = mini_app_body(BOT1_TOKEN);
        assert_eq!(
            dispatcher.verify(ClientType::MiniApp, "bot1", body.as_bytes()),
            Ok(true)
        );
        // Same payload presented to another bot fails.
        assert_eq!(
            dispatcher.verify(ClientType::MiniApp, "bot2", body.as_bytes()),
            Ok(false)
        );
    }

    #[test]
    fn unknown_bot_is_reported_before_parsing() {
        assert_eq!(
            dispatcher().verify(ClientType::MiniApp, "bot9", b""),
            Err(AuthenticationError::UnknownBot {
                name: "bot9".to_string()
            })
        );
    }

    #[test]
    fn malformed_payload_is_not_a_mismatch() {
        assert_eq!(
            dispatcher().verify(ClientType::MiniApp, "bot1", b""),
            Err(AuthenticationError::MalformedInput(MalformedInput::Empty))
        );
        assert_eq!(
            dispatcher().verify(ClientType::Widget, "bot1", br#"{"id":1}"#),
            Err(AuthenticationError::MalformedInput(MalformedInput::MissingHash))
        );
    }

    #[test]
    fn declared_client_type_is_parsed() {
        let dispatcher = dispatcher();
        let body = mini_app_body(BOT1_TOKEN);
        assert_eq!(
            dispatcher.verify_declared("TelegramMiniApp", "bot1", body.as_bytes()),
            Ok(true)
        );
        assert_eq!(
            dispatcher.verify_declared("TelegramDesktop", "bot1", body.as_bytes()),
            Err(AuthenticationError::InvalidClientType {
                declared: "TelegramDesktop".to_string()
            })
        );
    }

    #[test]
    fn authenticate_returns_bot_and_principal() {
        let login = dispatcher()
            .authenticate(ClientType::MiniApp, "bot1", mini_app_body(BOT1_TOKEN).as_bytes())
            .expect("login");
        assert_eq!(login.bot.default_redirect(), "/profile");
        assert_eq!(login.client, ClientType::MiniApp);
        assert_eq!(login.principal.external_id, TelegramId::new(5));
        assert_eq!(login.principal.first_name.as_deref(), Some("Ann"));
    }

    #[test]
    fn authenticate_reports_signature_mismatch() {
        let result = dispatcher().authenticate(
            ClientType::MiniApp,
            "bot2",
            mini_app_body(BOT1_TOKEN).as_bytes(),
        );
        assert_eq!(
            result,
            Err(AuthenticationError::SignatureMismatch {
                bot: "bot2".to_string()
            })
        );
    }

    #[test]
    fn authenticate_widget_login() {
        let fields = BTreeMap::from([
            ("auth_date".to_string(), "1700000000".to_string()),
            ("id".to_string(), "77".to_string()),
            ("username".to_string(), "carol".to_string()),
        ]);
        let hash = sign_widget(&fields, BOT2_TOKEN);
        let body =
            format!(r#"{{"id":77,"username":"carol","auth_date":1700000000,"hash":"{hash}"}}"#);

        let login = dispatcher()
            .authenticate(ClientType::Widget, "bot2", body.as_bytes())
            .expect("login");
        assert_eq!(login.principal.external_id, TelegramId::new(77));
        assert_eq!(login.bot.external_client_id(), "mininwork_bot");
    }

    #[test]
    fn verified_payload_without_identity_is_invalid_principal() {
        let fields = BTreeMap::from([("auth_date".to_string(), "1".to_string())]);
        let body = format!("auth_date=1&hash={}", sign_mini_app(&fields, BOT1_TOKEN));
        assert!(matches!(
            dispatcher().authenticate(ClientType::MiniApp, "bot1", body.as_bytes()),
            Err(AuthenticationError::InvalidPrincipal { .. })
        ));
    }
}
