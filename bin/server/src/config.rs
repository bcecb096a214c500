//! Centralized server configuration.
//!
//! Loaded via the `config` crate from an optional `atomlab.toml` in the
//! working directory, overridden by `ATOMLAB__*` environment variables
//! (e.g. `ATOMLAB__ACCESS_TOKEN__SECRET`, `ATOMLAB__BOTS__BOT1__TOKEN`).

use atomlab_telegram_auth::{
    BotDescriptor, BotSecret, DEFAULT_LIFETIME_SECONDS, SecretStore, SigningAlgorithm,
    TokenConfig,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;

/// Config file read when present.
pub const DEFAULT_CONFIG_FILE: &str = "atomlab.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "ATOMLAB";

/// Server configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// Bot used by the legacy `POST /auth` entry point.
    #[serde(default = "default_bot")]
    pub default_bot: String,

    /// Session token signing.
    pub access_token: AccessTokenConfig,

    /// Session cookie settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Bots users can log in through, keyed by logical name.
    #[serde(default)]
    pub bots: HashMap<String, BotConfig>,
}

/// Session token signing settings.
#[derive(Debug, Deserialize)]
pub struct AccessTokenConfig {
    /// Symmetric signing secret.
    pub secret: SecretString,

    /// `HS256`, `HS384`, or `HS512`.
    #[serde(default)]
    pub algorithm: SigningAlgorithm,

    /// Token lifetime, also used as the cookie `Max-Age`.
    #[serde(default = "default_lifetime_seconds")]
    pub lifetime_seconds: i64,
}

/// Session cookie settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Name of the cookie holding the session token.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to true; Mini Apps load cross-site and need `SameSite=None`,
    /// which browsers only accept together with `Secure`.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,
}

/// One bot's settings.
#[derive(Debug, Deserialize)]
pub struct BotConfig {
    /// The bot's Telegram username.
    pub client_id: String,

    /// Where the client goes after logging in.
    #[serde(default = "default_redirect_url")]
    pub redirect_url: String,

    /// The bot token issued by BotFather.
    pub token: SecretString,
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

fn default_bot() -> String {
    "bot1".to_string()
}

fn default_lifetime_seconds() -> i64 {
    DEFAULT_LIFETIME_SECONDS
}

fn default_cookie_name() -> String {
    "access_token".to_string()
}

fn default_secure_cookies() -> bool {
    true
}

fn default_redirect_url() -> String {
    "/profile".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            secure_cookies: default_secure_cookies(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from `atomlab.toml` (if present) and the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(Path::new(DEFAULT_CONFIG_FILE), environment())
    }

    fn load(file: &Path, env: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from(file).required(false))
            .add_source(env)
            .build()?
            .try_deserialize()
    }

    /// Returns the descriptor of every configured bot.
    #[must_use]
    pub fn bot_descriptors(&self) -> Vec<BotDescriptor> {
        self.bots
            .iter()
            .map(|(name, bot)| BotDescriptor::new(name, &bot.client_id, &bot.redirect_url))
            .collect()
    }

    /// Returns the settings for the session token service.
    #[must_use]
    pub fn token_config(&self) -> TokenConfig {
        TokenConfig {
            secret: SecretString::from(self.access_token.secret.expose_secret().to_string()),
            algorithm: self.access_token.algorithm,
            lifetime_seconds: self.access_token.lifetime_seconds,
        }
    }
}

impl SecretStore for ServerConfig {
    fn bot_secret(&self, bot: &BotDescriptor) -> Option<BotSecret> {
        self.bots
            .get(bot.logical_name())
            .map(|config| BotSecret::from(&config.token))
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let map = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(map))
    }

    fn missing_file() -> std::path::PathBuf {
        tempfile::tempdir()
            .expect("tempdir")
            .path()
            .join("atomlab.toml")
    }

    #[test]
    fn session_config_has_correct_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.cookie_name, "access_token");
        assert!(config.secure_cookies);
    }

    #[test]
    fn loads_from_environment_with_defaults() {
        let config = ServerConfig::load(
            &missing_file(),
            env(&[
                ("ATOMLAB__ACCESS_TOKEN__SECRET", "s3cret"),
                ("ATOMLAB__BOTS__BOT1__CLIENT_ID", "atomlab_bot"),
                ("ATOMLAB__BOTS__BOT1__TOKEN", "12345:ABCabc"),
            ]),
        )
        .expect("config");

        assert_eq!(config.bind_addr, default_bind_addr());
        assert_eq!(config.default_bot, "bot1");
        assert_eq!(config.access_token.algorithm, SigningAlgorithm::HS256);
        assert_eq!(config.access_token.lifetime_seconds, 3600);
        assert_eq!(config.bots["bot1"].redirect_url, "/profile");

        let descriptors = config.bot_descriptors();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].external_client_id(), "atomlab_bot");
        let secret = config.bot_secret(&descriptors[0]).expect("secret");
        assert_eq!(secret.expose(), "12345:ABCabc");
    }

    #[test]
    fn environment_overrides_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("atomlab.toml");
        let mut file = std::fs::File::create(&path).expect("create");
        write!(
            file,
            r#"
bind_addr = "127.0.0.1:9000"
default_bot = "bot2"

[access_token]
secret = "from-file"
algorithm = "HS512"
lifetime_seconds = 600

[session]
secure_cookies = false

[bots.bot2]
client_id = "mininwork_bot"
redirect_url = "/affirmations"
token = "67890:XYZxyz"
"#
        )
        .expect("write");

        let config = ServerConfig::load(
            &path,
            env(&[("ATOMLAB__ACCESS_TOKEN__LIFETIME_SECONDS", "120")]),
        )
        .expect("config");

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.default_bot, "bot2");
        assert_eq!(config.access_token.algorithm, SigningAlgorithm::HS512);
        assert_eq!(config.access_token.lifetime_seconds, 120);
        assert!(!config.session.secure_cookies);
        assert_eq!(config.bots["bot2"].redirect_url, "/affirmations");
        assert_eq!(config.token_config().secret.expose_secret(), "from-file");
    }

    #[test]
    fn missing_signing_secret_is_an_error() {
        assert!(ServerConfig::load(&missing_file(), env(&[])).is_err());
    }

    #[test]
    fn unsupported_algorithm_is_an_error() {
        let result = ServerConfig::load(
            &missing_file(),
            env(&[
                ("ATOMLAB__ACCESS_TOKEN__SECRET", "s3cret"),
                ("ATOMLAB__ACCESS_TOKEN__ALGORITHM", "RS256"),
            ]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let config = ServerConfig::load(
            &missing_file(),
            env(&[
                ("ATOMLAB__ACCESS_TOKEN__SECRET", "s3cret"),
                ("ATOMLAB__BOTS__BOT1__CLIENT_ID", "atomlab_bot"),
                ("ATOMLAB__BOTS__BOT1__TOKEN", "12345:ABCabc"),
            ]),
        )
        .expect("config");
        let debug = format!("{config:?}");
        assert!(!debug.contains("s3cret"));
        assert!(!debug.contains("ABCabc"));
    }
}
