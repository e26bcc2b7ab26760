//! Anonymous session tokens.
//!
//! An anonymous shopper is identified by an opaque token the client sends
//! with every cart request. When the client has none, the server issues one.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Errors that can occur when accepting a client-supplied session token.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionTokenError {
    /// The token is empty after trimming.
    #[error("session token cannot be empty")]
    Empty,
    /// The token is longer than allowed.
    #[error("session token must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The token contains characters outside printable ASCII.
    #[error("session token must be printable ASCII without spaces")]
    InvalidCharacter,
}

/// Opaque anonymous-session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionToken(String);

impl SessionToken {
    /// Maximum accepted token length.
    pub const MAX_LENGTH: usize = 128;

    /// Issue a fresh random token.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accept a token supplied by a client.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionTokenError`] if the token is empty, too long, or
    /// contains characters that cannot round-trip through an HTTP header.
    pub fn parse(s: &str) -> Result<Self, SessionTokenError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(SessionTokenError::Empty);
        }
        if trimmed.len() > Self::MAX_LENGTH {
            return Err(SessionTokenError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !trimmed.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(SessionTokenError::InvalidCharacter);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionToken {
    type Error = SessionTokenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionToken> for String {
    fn from(token: SessionToken) -> Self {
        token.0
    }
}
