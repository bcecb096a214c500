//! Mapping from Telegram identities to internal users.

use async_trait::async_trait;
use atomlab_core::{TelegramId, UserId};
use atomlab_telegram_auth::Principal;
use rootcause::prelude::Report;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::RwLock;

/// Errors from the user directory.
#[derive(Debug)]
pub enum DirectoryError {
    /// The backing store could not be reached or failed.
    Unavailable { details: String },
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { details } => write!(f, "user directory unavailable: {details}"),
        }
    }
}

impl std::error::Error for DirectoryError {}

/// What the directory knows about a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub telegram_id: TelegramId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub photo_url: Option<String>,
}

impl UserProfile {
    fn from_principal(id: UserId, principal: &Principal) -> Self {
        Self {
            id,
            telegram_id: principal.external_id,
            first_name: principal.first_name.clone(),
            last_name: principal.last_name.clone(),
            username: principal.username.clone(),
            photo_url: principal.photo_url.clone(),
        }
    }
}

/// Create-or-fetch store for users logging in through Telegram.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Returns the internal id for a Telegram account, creating the user on
    /// first login. Profile fields are refreshed from the principal.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn create_or_fetch(&self, principal: &Principal) -> Result<UserId, Report<DirectoryError>>;

    /// Looks up a user by internal id.
    async fn find(&self, id: UserId) -> Result<Option<UserProfile>, Report<DirectoryError>>;
}

#[derive(Debug, Default)]
struct Users {
    by_telegram_id: HashMap<TelegramId, UserId>,
    profiles: HashMap<UserId, UserProfile>,
    last_id: i64,
}

/// Process-local user directory.
///
/// Ids start at 1 and are never reused. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<Users>,
}

impl InMemoryUserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of known users.
    pub async fn len(&self) -> usize {
        self.users.read().await.profiles.len()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn create_or_fetch(&self, principal: &Principal) -> Result<UserId, Report<DirectoryError>> {
        let mut users = self.users.write().await;

        if let Some(&id) = users.by_telegram_id.get(&principal.external_id) {
            users
                .profiles
                .insert(id, UserProfile::from_principal(id, principal));
            return Ok(id);
        }

        users.last_id += 1;
        let id = UserId::new(users.last_id);
        users.by_telegram_id.insert(principal.external_id, id);
        users
            .profiles
            .insert(id, UserProfile::from_principal(id, principal));
        tracing::info!(user_id = %id, telegram_id = %principal.external_id, "created user");
        Ok(id)
    }

    async fn find(&self, id: UserId) -> Result<Option<UserProfile>, Report<DirectoryError>> {
        Ok(self.users.read().await.profiles.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(telegram_id: i64, username: &str) -> Principal {
        Principal {
            username: Some(username.to_string()),
            ..Principal::new(TelegramId::new(telegram_id))
        }
    }

    #[tokio::test]
    async fn first_login_creates_user() {
        let directory = InMemoryUserDirectory::new();
        let id = directory
            .create_or_fetch(&principal(500, "ann"))
            .await
            .expect("create");
        assert_eq!(id, UserId::new(1));
        assert_eq!(directory.len().await, 1);

        let profile = directory.find(id).await.expect("find").expect("profile");
        assert_eq!(profile.telegram_id, TelegramId::new(500));
        assert_eq!(profile.username.as_deref(), Some("ann"));
    }

    #[tokio::test]
    async fn repeat_login_returns_same_id_and_refreshes_profile() {
        let directory = InMemoryUserDirectory::new();
        let first = directory
            .create_or_fetch(&principal(500, "ann"))
            .await
            .expect("create");
        let second = directory
            .create_or_fetch(&principal(500, "ann_renamed"))
            .await
            .expect("fetch");
        assert_eq!(first, second);
        assert_eq!(directory.len().await, 1);

        let profile = directory.find(first).await.expect("find").expect("profile");
        assert_eq!(profile.username.as_deref(), Some("ann_renamed"));
    }

    #[tokio::test]
    async fn distinct_accounts_get_distinct_ids() {
        let directory = InMemoryUserDirectory::new();
        let a = directory.create_or_fetch(&principal(1, "a")).await.expect("a");
        let b = directory.create_or_fetch(&principal(2, "b")).await.expect("b");
        assert_ne!(a, b);
        assert!(directory.find(UserId::new(99)).await.expect("find").is_none());
    }
}
