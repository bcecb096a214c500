//! Telegram identities extracted from verified login payloads.

use crate::client::ClientType;
use crate::error::AuthenticationError;
use crate::signature::SignedPayload;
use atomlab_core::TelegramId;
use serde::{Deserialize, Serialize};

/// The Telegram account behind a verified login.
///
/// Built fresh for every successful verification and handed to the user
/// store, which maps it to an internal user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub external_id: TelegramId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
    pub is_premium: Option<bool>,
    pub photo_url: Option<String>,
    pub allows_write_to_pm: Option<bool>,
}

/// Shape of the Mini App `user` field.
#[derive(Debug, Deserialize)]
struct MiniAppUser {
    id: i64,
    first_name: Option<String>,
    last_name: Option<String>,
    username: Option<String>,
    language_code: Option<String>,
    is_premium: Option<bool>,
    photo_url: Option<String>,
    allows_write_to_pm: Option<bool>,
}

impl Principal {
    /// Creates a principal with only the Telegram id set.
    #[must_use]
    pub fn new(external_id: TelegramId) -> Self {
        Self {
            external_id,
            first_name: None,
            last_name: None,
            username: None,
            language_code: None,
            is_premium: None,
            photo_url: None,
            allows_write_to_pm: None,
        }
    }

    /// Extracts the identity from a payload that has already been verified.
    ///
    /// # Errors
    ///
    /// Returns [`AuthenticationError::InvalidPrincipal`] when the payload
    /// lacks a usable integer user id.
    pub fn from_payload(
        client: ClientType,
        payload: &SignedPayload,
    ) -> Result<Self, AuthenticationError> {
        match client {
            ClientType::MiniApp => Self::from_mini_app(payload),
            ClientType::Widget => Self::from_widget(payload),
        }
    }

    fn from_mini_app(payload: &SignedPayload) -> Result<Self, AuthenticationError> {
        let raw = payload
            .field("user")
            .ok_or_else(|| invalid("missing 'user' field"))?;
        let user: MiniAppUser = serde_json::from_str(raw)
            .map_err(|e| invalid(format!("unreadable 'user' field: {e}")))?;

        Ok(Self {
            external_id: TelegramId::new(user.id),
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            language_code: user.language_code,
            is_premium: user.is_premium,
            photo_url: user.photo_url,
            allows_write_to_pm: user.allows_write_to_pm,
        })
    }

    fn from_widget(payload: &SignedPayload) -> Result<Self, AuthenticationError> {
        let id = payload
            .field("id")
            .ok_or_else(|| invalid("missing 'id' field"))?;
        let id = id
            .parse::<i64>()
            .map_err(|e| invalid(format!("non-integer 'id' field: {e}")))?;
        let text = |key: &str| payload.field(key).map(str::to_string);

        Ok(Self {
            first_name: text("first_name"),
            last_name: text("last_name"),
            username: text("username"),
            photo_url: text("photo_url"),
            ..Self::new(TelegramId::new(id))
        })
    }

    /// Returns the best available display name.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(first), None) => Some(first.clone()),
            (None, Some(last)) => Some(last.clone()),
            (None, None) => self.username.clone(),
        }
    }
}

fn invalid(reason: impl Into<String>) -> AuthenticationError {
    AuthenticationError::InvalidPrincipal {
        reason: reason.into(),
    }
}
