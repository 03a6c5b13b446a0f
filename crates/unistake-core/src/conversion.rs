//! # Legacy Conversion Oracle
//!
//! Converts a raw amount denominated in a legacy staking system's unit into
//! the common accounting unit using a fixed `(ratio, divisor)` pair.
//!
//! ```text
//! remainder = amount mod divisor
//! converted = (amount - remainder) * ratio / divisor
//! ```
//!
//! Only the divisor-aligned portion converts. The remainder is reported to
//! the caller and never credited anywhere, so a legacy balance below one
//! divisor step is worth nothing in the common unit until more accrues.
//!
//! Because the aligned portion is an exact multiple of `divisor`, the
//! product is evaluated as `(aligned / divisor) * ratio`. The two forms are
//! equal for every input, and this one cannot overflow in the intermediate
//! product unless the final result does.

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::error::{ArithmeticError, ValidationError};

/// A fixed conversion rate from a legacy unit into the common unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RatioRepr", into = "RatioRepr")]
pub struct ConversionRatio {
    ratio: u128,
    divisor: u128,
}

/// The outcome of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    /// Common-unit value of the divisor-aligned portion.
    pub converted: Amount,
    /// Raw legacy amount below one divisor step, left unconverted.
    pub remainder: Amount,
}

impl ConversionRatio {
    /// Build a conversion ratio.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidConversionRatio`] if either term is zero.
    pub fn new(ratio: u128, divisor: u128) -> Result<Self, ValidationError> {
        if divisor == 0 {
            return Err(ValidationError::InvalidConversionRatio {
                ratio,
                divisor,
                reason: "divisor must be nonzero".to_string(),
            });
        }
        if ratio == 0 {
            return Err(ValidationError::InvalidConversionRatio {
                ratio,
                divisor,
                reason: "ratio must be nonzero".to_string(),
            });
        }
        Ok(Self { ratio, divisor })
    }

    /// The ratio numerator.
    pub fn ratio(&self) -> u128 {
        self.ratio
    }

    /// The fixed-point divisor.
    pub fn divisor(&self) -> u128 {
        self.divisor
    }

    /// Convert a raw legacy amount into the common unit.
    ///
    /// # Errors
    ///
    /// Returns [`ArithmeticError::Overflow`] if the converted value does not
    /// fit in an [`Amount`].
    pub fn convert(&self, amount: Amount) -> Result<Conversion, ArithmeticError> {
        let raw = amount.get();
        let remainder = raw % self.divisor;
        let steps = (raw - remainder) / self.divisor;
        let converted = steps
            .checked_mul(self.ratio)
            .ok_or(ArithmeticError::Overflow {
                operation: "convert",
            })?;
        Ok(Conversion {
            converted: Amount::new(converted),
            remainder: Amount::new(remainder),
        })
    }
}

impl std::fmt::Display for ConversionRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.ratio, self.divisor)
    }
}

#[derive(Serialize, Deserialize)]
struct RatioRepr {
    #[serde(with = "crate::amount::u128_string")]
    ratio: u128,
    #[serde(with = "crate::amount::u128_string")]
    divisor: u128,
}

impl TryFrom<RatioRepr> for ConversionRatio {
    type Error = ValidationError;

    fn try_from(value: RatioRepr) -> Result<Self, Self::Error> {
        Self::new(value.ratio, value.divisor)
    }
}

impl From<ConversionRatio> for RatioRepr {
    fn from(value: ConversionRatio) -> Self {
        Self {
            ratio: value.ratio,
            divisor: value.divisor,
        }
    }
}
