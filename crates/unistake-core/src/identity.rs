//! # Identity Newtypes
//!
//! Every participant in the ledger is identified by a 20-byte address
//! rendered as `0x` + 40 lowercase hex digits. Operators and applications
//! get their own newtypes over [`Address`] so the two namespaces cannot be
//! confused at a call site.
//!
//! ## Validation
//!
//! [`Address::new`] accepts mixed-case hex and normalizes to lowercase, so
//! two spellings of the same address compare equal.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Number of hex digits after the `0x` prefix.
const ADDRESS_HEX_LEN: usize = 40;

/// An account address.
///
/// Used directly for role holders (owner, beneficiary, authorizer,
/// governance, panic address) and wrapped by [`OperatorId`] and
/// [`ApplicationId`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Parse an address, normalizing hex digits to lowercase.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidAddress`] unless the input is `0x`
    /// followed by exactly 40 hex digits.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        let hex = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| ValidationError::InvalidAddress(s.clone()))?;
        if hex.len() != ADDRESS_HEX_LEN || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::InvalidAddress(s));
        }
        Ok(Self(format!("0x{}", hex.to_ascii_lowercase())))
    }

    /// Build the address whose low 8 bytes are `n` and whose high bytes are zero.
    ///
    /// Convenient for deterministic fixtures and scenario files.
    pub fn from_low_u64(n: u64) -> Self {
        Self(format!("0x{:0>40}", format!("{n:x}")))
    }

    /// The all-zero address.
    pub fn zero() -> Self {
        Self::from_low_u64(0)
    }

    /// Whether this is the all-zero address.
    pub fn is_zero(&self) -> bool {
        self.0[2..].bytes().all(|b| b == b'0')
    }

    /// Access the normalized string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Address {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl std::str::FromStr for Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The stake-bearing identity.
///
/// Distinct from the owner, beneficiary, and authorizer roles, which are
/// plain [`Address`]es recorded on the stake.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatorId(Address);

impl OperatorId {
    /// Wrap an address as an operator identity.
    pub fn new(address: Address) -> Self {
        Self(address)
    }

    /// The underlying address.
    pub fn address(&self) -> &Address {
        &self.0
    }
}

impl std::fmt::Display for OperatorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "operator:{}", self.0)
    }
}

/// An external consumer system drawing authorization against stake.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(Address);

impl ApplicationId {
    /// Wrap an address as an application identity.
    pub fn new(address: Address) -> Self {
        Self(address)
    }

    /// The underlying address. Applications call back into the ledger from it.
    pub fn address(&self) -> &Address {
        &self.0
    }
}

impl std::fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "application:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_accepts_mixed_case_and_normalizes() {
        let a = Address::new("0xAbCdEf0123456789aBcDeF0123456789AbCdEf01").unwrap();
        assert_eq!(a.as_str(), "0xabcdef0123456789abcdef0123456789abcdef01");
        let b = Address::new("0xabcdef0123456789abcdef0123456789abcdef01").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn address_rejects_bad_input() {
        assert!(Address::new("").is_err());
        assert!(Address::new("abcdef0123456789abcdef0123456789abcdef01").is_err());
        assert!(Address::new("0x1234").is_err());
        assert!(Address::new("0xgggggggggggggggggggggggggggggggggggggggg").is_err());
        assert!(Address::new("0xabcdef0123456789abcdef0123456789abcdef0123").is_err());
    }

    #[test]
    fn from_low_u64_pads_to_full_width() {
        let a = Address::from_low_u64(0xbeef);
        assert_eq!(a.as_str(), "0x000000000000000000000000000000000000beef");
        assert!(Address::new(a.as_str()).is_ok());
    }

    #[test]
    fn zero_address() {
        assert!(Address::zero().is_zero());
        assert!(!Address::from_low_u64(1).is_zero());
    }

    #[test]
    fn address_serde_validates() {
        let a = Address::from_low_u64(7);
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, "\"0x0000000000000000000000000000000000000007\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
        assert!(serde_json::from_str::<Address>("\"0x12\"").is_err());
    }

    #[test]
    fn operator_and_application_display_prefixes() {
        let op = OperatorId::new(Address::from_low_u64(1));
        let app = ApplicationId::new(Address::from_low_u64(1));
        assert!(op.to_string().starts_with("operator:0x"));
        assert!(app.to_string().starts_with("application:0x"));
        assert_eq!(op.address(), app.address());
    }

    #[test]
    fn operator_serializes_as_bare_address() {
        let op = OperatorId::new(Address::from_low_u64(2));
        let json = serde_json::to_string(&op).unwrap();
        assert_eq!(json, "\"0x0000000000000000000000000000000000000002\"");
    }
}
