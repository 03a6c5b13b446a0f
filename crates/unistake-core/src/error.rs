//! # Error Types
//!
//! Errors raised by the foundational types. Ledger-level failures live in
//! `unistake-ledger`; this module only covers malformed inputs and checked
//! arithmetic.

use thiserror::Error;

/// Input failed format validation at construction time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Address is not `0x` followed by 40 hex digits.
    #[error("invalid address: \"{0}\" (expected 0x followed by 40 hex digits)")]
    InvalidAddress(String),

    /// Amount string is not a non-negative base-10 integer.
    #[error("invalid amount: \"{0}\" (expected a non-negative integer)")]
    InvalidAmount(String),

    /// Conversion ratio cannot be used for conversion.
    #[error("invalid conversion ratio {ratio}/{divisor}: {reason}")]
    InvalidConversionRatio {
        /// The ratio numerator.
        ratio: u128,
        /// The fixed-point divisor.
        divisor: u128,
        /// Why it was rejected.
        reason: String,
    },

    /// Digest string is not 64 lowercase hex digits.
    #[error("invalid digest: \"{0}\" (expected 64 hex digits)")]
    InvalidDigest(String),
}

/// Checked arithmetic on amounts left the representable range.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArithmeticError {
    /// The result exceeds the maximum representable amount.
    #[error("arithmetic overflow in {operation}")]
    Overflow {
        /// The operation that overflowed.
        operation: &'static str,
    },

    /// The result would be negative.
    #[error("arithmetic underflow in {operation}")]
    Underflow {
        /// The operation that underflowed.
        operation: &'static str,
    },
}
