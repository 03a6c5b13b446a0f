//! # Legacy Staking Systems
//!
//! The ledger mirrors balances held in two predecessor staking systems.
//! It never moves their assets; it reads each system's record for an
//! operator and caches a converted copy (see [`StakeLedger::sync_legacy`]).
//!
//! [`LegacySource`] is the read-only port to one such system.
//! [`InMemoryLegacySource`] is a shared, mutable implementation used by the
//! scenario runner and tests.
//!
//! [`StakeLedger::sync_legacy`]: crate::StakeLedger::sync_legacy

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use unistake_core::{Address, Amount, OperatorId};

/// Which legacy system a balance comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LegacyKind {
    /// Legacy system A. Syncing requires the operator to have made this
    /// ledger eligible there.
    A,
    /// Legacy system B.
    B,
}

impl LegacyKind {
    /// Both legacy systems, in order.
    pub const ALL: [LegacyKind; 2] = [LegacyKind::A, LegacyKind::B];

    /// The canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }

    /// Whether the source must confirm eligibility before a sync.
    pub fn requires_eligibility(&self) -> bool {
        matches!(self, Self::A)
    }
}

impl std::fmt::Display for LegacyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operator's record as held by a legacy system, in its own units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyRecord {
    /// Owner of the stake in the legacy system.
    pub owner: Address,
    /// Beneficiary of the stake in the legacy system.
    pub beneficiary: Address,
    /// Authorizer of the stake in the legacy system.
    pub authorizer: Address,
    /// Staked amount in legacy units.
    pub amount: Amount,
}

/// Read access to one legacy staking system.
pub trait LegacySource: std::fmt::Debug + Send + Sync {
    /// The operator's record, `None` if the system has never seen it.
    fn stake_of(&self, operator: &OperatorId) -> Option<LegacyRecord>;

    /// Whether the operator has made `ledger` eligible to mirror its stake.
    fn is_eligible(&self, operator: &OperatorId, ledger: &Address) -> bool;
}

/// A legacy system held in memory.
///
/// Cloning shares the underlying data, so a test or scenario can keep a
/// handle and change balances after handing a clone to the ledger.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLegacySource {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    records: BTreeMap<OperatorId, LegacyRecord>,
    eligible: BTreeSet<(OperatorId, Address)>,
}

impl InMemoryLegacySource {
    /// An empty system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an operator's record.
    pub fn set_stake(&self, operator: OperatorId, record: LegacyRecord) {
        self.inner.write().records.insert(operator, record);
    }

    /// Change only the staked amount. Returns `false` if the operator has no record.
    pub fn set_amount(&self, operator: &OperatorId, amount: Amount) -> bool {
        match self.inner.write().records.get_mut(operator) {
            Some(record) => {
                record.amount = amount;
                true
            }
            None => false,
        }
    }

    /// Grant or revoke `ledger`'s eligibility for an operator.
    pub fn set_eligible(&self, operator: OperatorId, ledger: Address, eligible: bool) {
        let mut inner = self.inner.write();
        if eligible {
            inner.eligible.insert((operator, ledger));
        } else {
            inner.eligible.remove(&(operator, ledger));
        }
    }
}

impl LegacySource for InMemoryLegacySource {
    fn stake_of(&self, operator: &OperatorId) -> Option<LegacyRecord> {
        self.inner.read().records.get(operator).cloned()
    }

    fn is_eligible(&self, operator: &OperatorId, ledger: &Address) -> bool {
        self.inner
            .read()
            .eligible
            .contains(&(operator.clone(), ledger.clone()))
    }
}
