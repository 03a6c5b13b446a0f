//! # Common-Unit Amounts
//!
//! [`Amount`] is an unsigned integer count of the common accounting unit.
//! Native balances, converted legacy balances, and authorizations are all
//! expressed in it.
//!
//! ## Serialization
//!
//! Amounts serialize as decimal strings so 128-bit values survive JSON and
//! YAML consumers that parse numbers as doubles. Deserialization also accepts
//! plain integers for hand-written scenario files.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ArithmeticError, ValidationError};

/// A non-negative amount in the common accounting unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u128);

impl Amount {
    /// Zero.
    pub const ZERO: Amount = Amount(0);

    /// The largest representable amount.
    pub const MAX: Amount = Amount(u128::MAX);

    /// Wrap a raw integer.
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    /// The raw integer value.
    pub const fn get(self) -> u128 {
        self.0
    }

    /// Whether the amount is zero.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    pub fn checked_add(self, rhs: Amount) -> Result<Amount, ArithmeticError> {
        self.0
            .checked_add(rhs.0)
            .map(Amount)
            .ok_or(ArithmeticError::Overflow { operation: "add" })
    }

    /// Checked subtraction.
    pub fn checked_sub(self, rhs: Amount) -> Result<Amount, ArithmeticError> {
        self.0
            .checked_sub(rhs.0)
            .map(Amount)
            .ok_or(ArithmeticError::Underflow { operation: "sub" })
    }

    /// Subtraction clamped at zero.
    pub fn saturating_sub(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_sub(rhs.0))
    }

    /// Sum an iterator of amounts, failing on overflow.
    pub fn checked_sum<I>(iter: I) -> Result<Amount, ArithmeticError>
    where
        I: IntoIterator<Item = Amount>,
    {
        iter.into_iter()
            .try_fold(Amount::ZERO, |acc, next| acc.checked_add(next))
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(u128::from(value))
    }
}

impl std::str::FromStr for Amount {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_u128(s).map(Amount)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        u128_string::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u128_string::deserialize(deserializer).map(Amount)
    }
}

/// Parse a strict base-10 unsigned integer (no sign, no separators).
fn parse_u128(s: &str) -> Result<u128, ValidationError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidAmount(s.to_string()));
    }
    s.parse::<u128>()
        .map_err(|_| ValidationError::InvalidAmount(s.to_string()))
}

/// Serde adapter storing a `u128` as a decimal string.
///
/// Use with `#[serde(with = "unistake_core::amount::u128_string")]`.
pub mod u128_string {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    /// Serialize as a decimal string.
    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    /// Deserialize from a decimal string or a non-negative integer.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        deserializer.deserialize_any(U128Visitor)
    }

    struct U128Visitor;

    impl<'de> Visitor<'de> for U128Visitor {
        type Value = u128;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("a non-negative integer or decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
            Ok(u128::from(v))
        }

        fn visit_u128<E: de::Error>(self, v: u128) -> Result<u128, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u128, E> {
            u128::try_from(v).map_err(|_| E::custom(format!("negative amount: {v}")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
            super::parse_u128(v).map_err(E::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_add_overflows() {
        assert_eq!(
            Amount::MAX.checked_add(Amount::new(1)),
            Err(ArithmeticError::Overflow { operation: "add" })
        );
        assert_eq!(
            Amount::new(2).checked_add(Amount::new(3)).unwrap(),
            Amount::new(5)
        );
    }

    #[test]
    fn checked_sub_underflows() {
        assert!(Amount::new(2).checked_sub(Amount::new(3)).is_err());
        assert_eq!(
            Amount::new(3).checked_sub(Amount::new(3)).unwrap(),
            Amount::ZERO
        );
    }

    #[test]
    fn saturating_sub_clamps() {
        assert_eq!(Amount::new(2).saturating_sub(Amount::new(9)), Amount::ZERO);
        assert_eq!(Amount::new(9).saturating_sub(Amount::new(2)), Amount::new(7));
    }

    #[test]
    fn checked_sum_of_empty_is_zero() {
        assert_eq!(Amount::checked_sum(Vec::new()).unwrap(), Amount::ZERO);
        assert!(Amount::checked_sum([Amount::MAX, Amount::new(1)]).is_err());
    }

    #[test]
    fn parse_rejects_signs_and_decimals() {
        assert!("".parse::<Amount>().is_err());
        assert!("-1".parse::<Amount>().is_err());
        assert!("+1".parse::<Amount>().is_err());
        assert!("1.5".parse::<Amount>().is_err());
        assert!("1_000".parse::<Amount>().is_err());
        assert_eq!("1000".parse::<Amount>().unwrap(), Amount::new(1000));
    }

    #[test]
    fn serializes_as_string() {
        let amount = Amount::new(340_282_366_920_938_463_463_374_607_431_768_211_455);
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"340282366920938463463374607431768211455\"");
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amount);
    }

    #[test]
    fn deserializes_plain_integers() {
        let a: Amount = serde_json::from_str("42").unwrap();
        assert_eq!(a, Amount::new(42));
        assert!(serde_json::from_str::<Amount>("-42").is_err());
        assert!(serde_json::from_str::<Amount>("\"4x\"").is_err());
    }
}
