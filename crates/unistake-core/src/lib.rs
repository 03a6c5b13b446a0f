#![deny(missing_docs)]

//! # unistake-core: Foundational Types for the Unified Stake Ledger
//!
//! This crate defines the primitives every other crate in the workspace
//! depends on. It has no internal crate dependencies, only `serde`,
//! `thiserror`, and `sha2` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for identities.** An [`OperatorId`] and an
//!    [`ApplicationId`] are both addresses underneath, but you cannot pass
//!    one where the other is expected.
//!
//! 2. **[`Amount`] is the only money type.** Every balance is an integer
//!    count of the common accounting unit. Arithmetic is checked and
//!    overflow surfaces as [`ArithmeticError`], never wraps.
//!
//! 3. **Conversion lives in one place.** Legacy amounts enter the common
//!    unit only through [`ConversionRatio::convert`].
//!
//! 4. **Logical time.** The ledger never reads a wall clock. Every
//!    transaction carries the [`Tick`] assigned by the external sequencer.

pub mod amount;
pub mod conversion;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

// Re-export primary types at crate root for ergonomic imports.
pub use amount::Amount;
pub use conversion::{Conversion, ConversionRatio};
pub use digest::ChainDigest;
pub use error::{ArithmeticError, ValidationError};
pub use identity::{Address, ApplicationId, OperatorId};
pub use temporal::Tick;
