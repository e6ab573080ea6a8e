//! Session identifier resolution
//!
//! The session identifier is resolved exactly once at startup: an explicit
//! identifier (CLI flag or config file) is used verbatim, otherwise a short
//! random one is generated. It is immutable for the process lifetime and is
//! only ever used as a URL path segment. No uniqueness is guaranteed beyond
//! the randomness itself.

use std::fmt;

use rand::{Rng, distributions::Alphanumeric};

/// Length of generated session identifiers
pub const SESSION_ID_LEN: usize = 8;

/// An opaque conversation session identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(String);

impl SessionId {
    /// Resolve the session identifier from an optional explicit value
    ///
    /// An empty or whitespace-only explicit value is treated as absent.
    #[must_use]
    pub fn resolve(explicit: Option<&str>) -> Self {
        match explicit.map(str::trim) {
            Some(id) if !id.is_empty() => Self(id.to_string()),
            _ => {
                let id = Self::generate();
                tracing::info!(session = %id, "generated new session id");
                id
            }
        }
    }

    /// Generate a random lowercase alphanumeric session identifier
    #[must_use]
    pub fn generate() -> Self {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_ID_LEN)
            .map(char::from)
            .collect();
        Self(id.to_lowercase())
    }

    /// The identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_id_is_used_verbatim() {
        let session = SessionId::resolve(Some("abc123"));
        assert_eq!(session.as_str(), "abc123");
    }

    #[test]
    fn blank_explicit_id_falls_back_to_generation() {
        let session = SessionId::resolve(Some("   "));
        assert_eq!(session.as_str().len(), SESSION_ID_LEN);
    }

    #[test]
    fn generated_id_is_lowercase_alphanumeric() {
        let session = SessionId::generate();
        assert_eq!(session.as_str().len(), SESSION_ID_LEN);
        assert!(
            session
                .as_str()
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn generated_ids_differ() {
        // Collision is possible but vanishingly unlikely across a handful
        let ids: Vec<_> = (0..8).map(|_| SessionId::generate()).collect();
        assert!(ids.windows(2).any(|w| w[0] != w[1]));
    }
}
