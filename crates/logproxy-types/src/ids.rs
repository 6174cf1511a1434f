//! Validated identifiers.
//!
//! Server tokens and session ids end up in file names on disk, so both are
//! restricted to a conservative character set at construction time. A value
//! of either type is always safe to join onto a directory path.
//!
//! [`ConnectionId`] identifies a live viewer connection and uses UUID v7
//! (time-ordered) so ids sort by connection time in logs.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypesError;
use crate::time::LogTimestamp;

/// Longest accepted server token, in bytes.
const MAX_TOKEN_LEN: usize = 128;

/// Longest accepted session id, in bytes (token + `_` + encoded timestamp).
const MAX_SESSION_ID_LEN: usize = 192;

/// Identity of an ingesting game server (`X-Server-Instance-Token`).
///
/// Only ASCII letters, digits, `_` and `-` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServerToken(String);

impl ServerToken {
    /// Validate and wrap a raw token.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::InvalidToken`] if the token is empty, longer
    /// than 128 bytes, or contains anything outside `[A-Za-z0-9_-]`.
    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_TOKEN_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if valid {
            Ok(Self(raw.to_owned()))
        } else {
            Err(TypesError::InvalidToken(raw.to_owned()))
        }
    }

    /// Borrow the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ServerToken {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ServerToken> for String {
    fn from(token: ServerToken) -> Self {
        token.0
    }
}

impl fmt::Display for ServerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one log session.
///
/// Derived deterministically from the owning token and the session start
/// timestamp: `{token}_{YYYYMMDD-HHMMSS-mmm}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogSessionId(String);

impl LogSessionId {
    /// Build the session id for a session of `token` starting at `start`.
    pub fn derive(token: &ServerToken, start: &LogTimestamp) -> Self {
        Self(format!("{}_{}", token.as_str(), start.file_safe()))
    }

    /// Validate a session id received from the outside (e.g. a URL path).
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::InvalidSessionId`] if the id is empty, too
    /// long, starts with a dot, or contains anything outside
    /// `[A-Za-z0-9_.-]`.
    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_SESSION_ID_LEN
            && !raw.starts_with('.')
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'));
        if valid {
            Ok(Self(raw.to_owned()))
        } else {
            Err(TypesError::InvalidSessionId(raw.to_owned()))
        }
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LogSessionId {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LogSessionId> for String {
    fn from(id: LogSessionId) -> Self {
        id.0
    }
}

impl fmt::Display for LogSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a live viewer connection registered with the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn token_accepts_file_safe_characters() {
        assert!(ServerToken::parse("abc-DEF_123").is_ok());
    }

    #[test]
    fn token_rejects_path_tricks_and_empty() {
        assert!(ServerToken::parse("").is_err());
        assert!(ServerToken::parse("../etc").is_err());
        assert!(ServerToken::parse("a b").is_err());
        assert!(ServerToken::parse(&"x".repeat(129)).is_err());
    }

    #[test]
    fn session_id_is_derived_from_token_and_start() {
        let token = ServerToken::parse("srv1").unwrap();
        let start: LogTimestamp = "01/30/2025 - 16:33:56.470".parse().unwrap();
        let id = LogSessionId::derive(&token, &start);
        assert_eq!(id.as_str(), "srv1_20250130-163356-470");
        assert!(LogSessionId::parse(id.as_str()).is_ok());
    }

    #[test]
    fn session_id_rejects_traversal() {
        assert!(LogSessionId::parse("..").is_err());
        assert!(LogSessionId::parse("a/b").is_err());
        assert!(LogSessionId::parse(".hidden").is_err());
    }

    #[test]
    fn token_deserialization_validates() {
        let ok: Result<ServerToken, _> = serde_json::from_str("\"good_token\"");
        assert!(ok.is_ok());
        let bad: Result<ServerToken, _> = serde_json::from_str("\"bad token\"");
        assert!(bad.is_err());
    }
}
