//! Strongly-typed identifiers.
//!
//! Both identifiers wrap a signed 64-bit integer: internal user ids are
//! assigned by the user store, Telegram ids are assigned by Telegram and
//! arrive inside signed login payloads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Generates a numeric ID newtype with parsing and display support.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw integer id.
            #[must_use]
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw integer value.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<i64>()
                    .map(Self)
                    .map_err(|e| ParseIdError {
                        id_type: stringify!($name),
                        reason: e.to_string(),
                    })
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Internal identifier of a registered user.
    ///
    /// This is the value carried as the `sub` claim of session tokens.
    UserId
);

define_id!(
    /// Telegram account identifier, as reported by a verified login payload.
    TelegramId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_bare_integer() {
        assert_eq!(UserId::new(42).to_string(), "42");
        assert_eq!(TelegramId::new(-1001).to_string(), "-1001");
    }

    #[test]
    fn parse_round_trips_display() {
        let id = UserId::new(7);
        let parsed: UserId = id.to_string().parse().expect("should parse");
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_rejects_non_numeric() {
        let err = "usr_abc".parse::<UserId>().unwrap_err();
        assert_eq!(err.id_type, "UserId");
        assert!(err.to_string().contains("UserId"));
    }

    #[test]
    fn serializes_as_plain_number() {
        let json = serde_json::to_string(&TelegramId::new(5)).expect("serialize");
        assert_eq!(json, "5");
        let parsed: TelegramId = serde_json::from_str("5").expect("deserialize");
        assert_eq!(parsed.get(), 5);
    }
}
