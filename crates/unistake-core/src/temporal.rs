//! # Logical Time
//!
//! The ledger runs inside an external sequencer that orders every
//! transaction and stamps it with a monotonically non-decreasing logical
//! time. [`Tick`] is that stamp. The ledger never consults a wall clock, so
//! replaying the same transactions always reproduces the same state.

use serde::{Deserialize, Serialize};

/// A logical time stamp assigned by the sequencer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Tick(u64);

impl Tick {
    /// The start of time.
    pub const GENESIS: Tick = Tick(0);

    /// Wrap a raw tick count.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw tick count.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Ticks elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Advance by `ticks`, clamped at the maximum.
    pub fn saturating_add(self, ticks: u64) -> Tick {
        Tick(self.0.saturating_add(ticks))
    }
}

impl From<u64> for Tick {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Tick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}
