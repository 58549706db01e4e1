//! Collision-resistant identifiers for naming artifact sets.

use std::fmt;

use rand::rngs::OsRng;
use rand::TryRngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bytes of randomness per identifier.
pub const IDENTIFIER_BYTES: usize = 16;

/// Errors produced while generating or parsing an identifier.
#[derive(Debug, Error)]
pub enum IdentifierError {
    #[error("failed to read OS entropy: {0}")]
    Entropy(String),

    #[error("invalid identifier: {0}")]
    Invalid(String),
}

/// Fixed-width lowercase hex token embedded in destination stems.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Generate a new identifier from the OS entropy source.
    ///
    /// Returns an error instead of degrading to an empty or repeated token,
    /// since the artifact set cannot be named safely without one.
    pub fn generate() -> Result<Self, IdentifierError> {
        let mut bytes = [0u8; IDENTIFIER_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| IdentifierError::Entropy(e.to_string()))?;
        Ok(Self::from_bytes(&bytes))
    }

    /// Encode raw bytes as an identifier.
    pub fn from_bytes(bytes: &[u8; IDENTIFIER_BYTES]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Parse an existing identifier, e.g. when re-running a job by hand.
    pub fn parse(s: &str) -> Result<Self, IdentifierError> {
        let valid = s.len() == IDENTIFIER_BYTES * 2
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !valid {
            return Err(IdentifierError::Invalid(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_generate_is_fixed_width_lowercase_hex() {
        let id = Identifier::generate().unwrap();
        assert_eq!(id.as_str().len(), 32);
        assert!(id
            .as_str()
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_generate_is_unique() {
        let ids: HashSet<_> = (0..1000).map(|_| Identifier::generate().unwrap()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_from_bytes() {
        let mut bytes = [0u8; IDENTIFIER_BYTES];
        bytes[0] = 0xa1;
        bytes[1] = 0xb2;
        bytes[15] = 0xff;
        let id = Identifier::from_bytes(&bytes);
        assert_eq!(id.as_str(), format!("a1b2{}ff", "0".repeat(26)));
    }

    #[test]
    fn test_parse() {
        assert_ok!(Identifier::parse("0123456789abcdef0123456789abcdef"));
        assert_err!(Identifier::parse("0123456789ABCDEF0123456789ABCDEF"));
        assert_err!(Identifier::parse("abc"));
        assert_err!(Identifier::parse(""));
    }
}
