//! Telegram client types.
//!
//! The client type is declared by the caller (an HTTP header), so it is
//! untrusted: it picks the verification algorithm and nothing else.

use crate::error::{AuthenticationError, MalformedInput};
use crate::signature::{self, SignedPayload};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Header carrying the declared client type.
pub const CLIENT_SOURCE_HEADER: &str = "x-client-source";

/// The Telegram integration a login request claims to come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClientType {
    /// Embedded WebView launched from a bot.
    #[serde(rename = "TelegramMiniApp")]
    MiniApp,
    /// Standalone login button on a web page.
    #[serde(rename = "TelegramWidget")]
    Widget,
}

impl ClientType {
    /// Every supported client type.
    pub const ALL: [Self; 2] = [Self::MiniApp, Self::Widget];

    /// Returns the wire name used in the client source header.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MiniApp => "TelegramMiniApp",
            Self::Widget => "TelegramWidget",
        }
    }

    /// Parses a raw payload in this client's encoding.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedInput`] if the payload cannot be parsed.
    pub fn parse(&self, payload: &[u8]) -> Result<SignedPayload, MalformedInput> {
        match self {
            Self::MiniApp => signature::parse_mini_app(payload),
            Self::Widget => signature::parse_widget(payload),
        }
    }

    /// Checks a parsed payload with this client's signing scheme.
    #[must_use]
    pub fn verify_parsed(&self, payload: &SignedPayload, bot_token: &str) -> bool {
        match self {
            Self::MiniApp => signature::verify_mini_app_payload(payload, bot_token),
            Self::Widget => signature::verify_widget_payload(payload, bot_token),
        }
    }

    /// Parses and verifies a raw payload.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedInput`] if the payload cannot be parsed.
    pub fn verify(&self, payload: &[u8], bot_token: &str) -> Result<bool, MalformedInput> {
        let parsed = self.parse(payload)?;
        Ok(self.verify_parsed(&parsed, bot_token))
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientType {
    type Err = AuthenticationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|client| client.as_str() == s)
            .ok_or_else(|| AuthenticationError::InvalidClientType {
                declared: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn parses_wire_names() {
        assert_eq!("TelegramMiniApp".parse::<ClientType>(), Ok(ClientType::MiniApp));
        assert_eq!("TelegramWidget".parse::<ClientType>(), Ok(ClientType::Widget));
    }

    #[test]
    fn rejects_unknown_and_differently_cased_names() {
        for declared in ["", "telegramwidget", "TelegramBot", "MiniApp"] {
            assert_eq!(
                declared.parse::<ClientType>(),
                Err(AuthenticationError::InvalidClientType {
                    declared: declared.to_string()
                })
            );
        }
    }

    #[test]
    fn display_matches_wire_name() {
        for client in ClientType::ALL {
            assert_eq!(client.to_string().parse::<ClientType>(), Ok(client));
        }
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&ClientType::Widget).expect("serialize");
        assert_eq!(json, "\"TelegramWidget\"");
    }

    #[test]
    fn each_variant_runs_its_own_algorithm() {
        let fields = BTreeMap::from([("id".to_string(), "5".to_string())]);
        let secret = "1:abc";

        let mini_app = format!("id=5&hash={}", signature::sign_mini_app(&fields, secret));
        assert_eq!(ClientType::MiniApp.verify(mini_app.as_bytes(), secret), Ok(true));
        assert_eq!(ClientType::Widget.verify(mini_app.as_bytes(), secret), Ok(false));

        let widget = format!(
            r#"{{"id":5,"hash":"{}"}}"#,
            signature::sign_widget(&fields, secret)
        );
        assert_eq!(ClientType::Widget.verify(widget.as_bytes(), secret), Ok(true));
    }
}
