//! # Stake Records
//!
//! One [`StakeRecord`] per operator: three role addresses, a native balance,
//! a cached converted copy of each legacy balance, and the time of the last
//! fresh commitment.

use serde::{Deserialize, Serialize};

use unistake_core::{Address, Amount, ArithmeticError, Tick};

use crate::legacy::LegacyKind;

/// Where a balance lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakeSource {
    /// Tokens held in this ledger's custody.
    Native,
    /// Mirrored from legacy system A.
    LegacyA,
    /// Mirrored from legacy system B.
    LegacyB,
}

impl StakeSource {
    /// All sources, in order.
    pub const ALL: [StakeSource; 3] = [Self::Native, Self::LegacyA, Self::LegacyB];

    /// The canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::LegacyA => "legacy_a",
            Self::LegacyB => "legacy_b",
        }
    }
}

impl From<LegacyKind> for StakeSource {
    fn from(kind: LegacyKind) -> Self {
        match kind {
            LegacyKind::A => Self::LegacyA,
            LegacyKind::B => Self::LegacyB,
        }
    }
}

impl std::fmt::Display for StakeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three addresses attached to an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    /// Controls the stake and may withdraw it.
    pub owner: Address,
    /// Receives rewards.
    pub beneficiary: Address,
    /// Manages application authorizations.
    pub authorizer: Address,
}

/// A cached legacy balance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyBalance {
    /// Last observed amount in legacy units.
    pub raw: Amount,
    /// `raw` in common units, remainder discarded.
    pub converted: Amount,
}

/// Everything the ledger holds for one operator, apart from authorizations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRecord {
    /// Role addresses.
    pub roles: Roles,
    /// Balance in the ledger's custody.
    pub native: Amount,
    /// Mirror of legacy system A.
    pub legacy_a: LegacyBalance,
    /// Mirror of legacy system B.
    pub legacy_b: LegacyBalance,
    /// Time of the last fresh commitment.
    pub committed_at: Tick,
}

impl StakeRecord {
    /// A record with the given roles and no balance.
    pub fn new(roles: Roles, committed_at: Tick) -> Self {
        Self {
            roles,
            native: Amount::ZERO,
            legacy_a: LegacyBalance::default(),
            legacy_b: LegacyBalance::default(),
            committed_at,
        }
    }

    /// Cached legacy balance for `kind`.
    pub fn legacy(&self, kind: LegacyKind) -> &LegacyBalance {
        match kind {
            LegacyKind::A => &self.legacy_a,
            LegacyKind::B => &self.legacy_b,
        }
    }

    /// Mutable cached legacy balance for `kind`.
    pub fn legacy_mut(&mut self, kind: LegacyKind) -> &mut LegacyBalance {
        match kind {
            LegacyKind::A => &mut self.legacy_a,
            LegacyKind::B => &mut self.legacy_b,
        }
    }

    /// Balance of one source in common units.
    pub fn balance(&self, source: StakeSource) -> Amount {
        match source {
            StakeSource::Native => self.native,
            StakeSource::LegacyA => self.legacy_a.converted,
            StakeSource::LegacyB => self.legacy_b.converted,
        }
    }

    /// Sum of all three balances.
    pub fn checked_total(&self) -> Result<Amount, ArithmeticError> {
        Amount::checked_sum(StakeSource::ALL.iter().map(|s| self.balance(*s)))
    }

    /// Sum of all three balances, clamped at [`Amount::MAX`].
    ///
    /// Mutations go through [`checked_total`](Self::checked_total), so a
    /// record held by the ledger never clamps.
    pub fn total(&self) -> Amount {
        self.checked_total().unwrap_or(Amount::MAX)
    }

    /// Whether every balance and cached raw amount is zero.
    pub fn is_empty(&self) -> bool {
        self.native.is_zero()
            && self.legacy_a == LegacyBalance::default()
            && self.legacy_b == LegacyBalance::default()
    }
}
