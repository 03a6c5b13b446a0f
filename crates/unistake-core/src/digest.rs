//! # Chained Event Digests
//!
//! Every state change the ledger makes is appended to an event log whose
//! entries are linked by SHA-256:
//!
//! ```text
//! digest_0 = GENESIS (32 zero bytes)
//! digest_n = SHA256(digest_{n-1} || payload_n)
//! ```
//!
//! An observer holding the latest digest can detect any rewrite, reorder,
//! or omission of earlier entries by recomputing the chain.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ValidationError;

/// A 32-byte SHA-256 link in the event chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChainDigest([u8; 32]);

impl ChainDigest {
    /// The digest preceding the first entry.
    pub const GENESIS: ChainDigest = ChainDigest([0u8; 32]);

    /// Extend the chain from `self` with `payload`.
    pub fn chain(&self, payload: &[u8]) -> ChainDigest {
        let mut hasher = Sha256::new();
        hasher.update(self.0);
        hasher.update(payload);
        ChainDigest(hasher.finalize().into())
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse 64 hex digits.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDigest`] on any other input.
    pub fn from_hex(s: &str) -> Result<Self, ValidationError> {
        if s.len() != 64 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ValidationError::InvalidDigest(s.to_string()));
        }
        let mut out = [0u8; 32];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = u8::from_str_radix(&s[2 * i..2 * i + 2], 16)
                .map_err(|_| ValidationError::InvalidDigest(s.to_string()))?;
        }
        Ok(Self(out))
    }
}

impl TryFrom<String> for ChainDigest {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<ChainDigest> for String {
    fn from(value: ChainDigest) -> Self {
        value.to_hex()
    }
}

impl std::fmt::Display for ChainDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_is_deterministic_and_order_sensitive() {
        let a = ChainDigest::GENESIS.chain(b"one").chain(b"two");
        let b = ChainDigest::GENESIS.chain(b"one").chain(b"two");
        let c = ChainDigest::GENESIS.chain(b"two").chain(b"one");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn chaining_moves_off_genesis() {
        let d = ChainDigest::GENESIS.chain(b"abc");
        assert_eq!(d.to_hex().len(), 64);
        assert_ne!(d, ChainDigest::GENESIS);
    }

    #[test]
    fn hex_roundtrip() {
        let d = ChainDigest::GENESIS.chain(b"payload");
        let parsed = ChainDigest::from_hex(&d.to_hex()).unwrap();
        assert_eq!(parsed, d);
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(ChainDigest::from_hex("").is_err());
        assert!(ChainDigest::from_hex(&"g".repeat(64)).is_err());
        assert!(ChainDigest::from_hex(&"0".repeat(63)).is_err());
    }

    #[test]
    fn from_hex_rejects_signs() {
        assert!(ChainDigest::from_hex(&"+f".repeat(32)).is_err());
        assert!(ChainDigest::from_hex(&format!("+{}", "0".repeat(63))).is_err());
    }

    #[test]
    fn display_is_tagged() {
        assert!(ChainDigest::GENESIS.to_string().starts_with("sha256:0000"));
    }
}
