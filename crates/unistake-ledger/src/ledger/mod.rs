//! # Stake Ledger Aggregate
//!
//! [`StakeLedger`] owns every participant record, every application
//! record, and the event log. All mutations take `&mut self` and a
//! [`TxContext`] naming the caller and the current tick.
//!
//! ## Atomicity
//!
//! Each operation validates, computes the new values, and builds its event
//! records before touching state. Application notifications run after
//! validation and before the first write; a rejection leaves the ledger
//! as it was. Nothing after the first write can fail.
//!
//! ## Layout
//!
//! - `staking.rs`: native commitments and legacy synchronization
//! - `authorization.rs`: increases and the two-phase decrease
//! - `unstaking.rs`: slack-bounded withdrawals
//! - `governance.rs`: application registry and parameters

mod authorization;
mod governance;
mod staking;
mod unstaking;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use unistake_core::{Address, Amount, ApplicationId, ChainDigest, ConversionRatio, OperatorId, Tick};
use unistake_state::{ApplicationRecord, AuthorizationEntry, StateError};

use crate::application::{Application, ApplicationRejection};
use crate::config::{ConfigError, LedgerConfig};
use crate::error::{InvalidOperatorReason, LedgerError, Role};
use crate::events::{EventLog, EventRecord, LedgerEvent};
use crate::invariant;
use crate::legacy::{LegacyKind, LegacySource};
use crate::stake::{Roles, StakeRecord, StakeSource};

/// Who is calling and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxContext {
    /// The calling address.
    pub caller: Address,
    /// Current logical time.
    pub at: Tick,
}

impl TxContext {
    /// A context for `caller` at `at`.
    pub fn new(caller: Address, at: Tick) -> Self {
        Self { caller, at }
    }
}

/// An operator's stake and its authorizations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Roles and balances.
    pub stake: StakeRecord,
    /// Authorization per application. Entries are kept once created.
    pub authorizations: BTreeMap<ApplicationId, AuthorizationEntry>,
}

impl Participant {
    fn new(stake: StakeRecord) -> Self {
        Self {
            stake,
            authorizations: BTreeMap::new(),
        }
    }

    /// Authorized amount per application, zero entries included.
    pub fn authorized_amounts(&self) -> impl Iterator<Item = Amount> + '_ {
        self.authorizations.values().map(AuthorizationEntry::authorized)
    }

    /// Number of applications holding a nonzero authorization.
    pub fn active_applications(&self) -> usize {
        self.authorized_amounts().filter(|a| !a.is_zero()).count()
    }

    /// Whether the operator holds any balance or authorization.
    pub fn is_in_use(&self) -> bool {
        !self.stake.is_empty() || self.authorizations.values().any(|e| !e.is_empty())
    }
}

/// Serializable view of the whole ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Current governance address.
    pub governance: Address,
    /// Current minimum fresh commitment.
    pub minimum_commitment: Amount,
    /// Current per-operator application ceiling.
    pub authorization_ceiling: u32,
    /// Native tokens in custody.
    pub native_custody: Amount,
    /// Every participant.
    pub participants: BTreeMap<OperatorId, Participant>,
    /// Every application record.
    pub applications: BTreeMap<ApplicationId, ApplicationRecord>,
    /// Number of events emitted.
    pub event_count: usize,
    /// Event chain head.
    pub event_head: ChainDigest,
}

/// The unified stake ledger.
#[derive(Debug)]
pub struct StakeLedger {
    config: LedgerConfig,
    participants: BTreeMap<OperatorId, Participant>,
    applications: BTreeMap<ApplicationId, ApplicationRecord>,
    endpoints: BTreeMap<ApplicationId, Arc<dyn Application>>,
    legacy_a: Arc<dyn LegacySource>,
    legacy_b: Arc<dyn LegacySource>,
    native_custody: Amount,
    events: EventLog,
}

impl StakeLedger {
    /// Build an empty ledger over two legacy systems.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if the configuration fails validation.
    pub fn new(
        config: LedgerConfig,
        legacy_a: Arc<dyn LegacySource>,
        legacy_b: Arc<dyn LegacySource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            participants: BTreeMap::new(),
            applications: BTreeMap::new(),
            endpoints: BTreeMap::new(),
            legacy_a,
            legacy_b,
            native_custody: Amount::ZERO,
            events: EventLog::new(),
        })
    }

    // ── Views ───────────────────────────────────────────────────────

    /// Current parameters, governance-adjusted values included.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Current governance address.
    pub fn governance(&self) -> &Address {
        &self.config.governance
    }

    /// Native tokens held in custody across all operators.
    pub fn native_custody(&self) -> Amount {
        self.native_custody
    }

    /// The event log.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// An operator's record and authorizations.
    pub fn participant(&self, operator: &OperatorId) -> Option<&Participant> {
        self.participants.get(operator)
    }

    /// Every participant, ordered by operator.
    pub fn participants(&self) -> impl Iterator<Item = (&OperatorId, &Participant)> {
        self.participants.iter()
    }

    /// An operator's stake record.
    pub fn stake(&self, operator: &OperatorId) -> Option<&StakeRecord> {
        self.participants.get(operator).map(|p| &p.stake)
    }

    /// An operator's roles.
    pub fn roles(&self, operator: &OperatorId) -> Option<&Roles> {
        self.stake(operator).map(|s| &s.roles)
    }

    /// Total stake across all sources, zero for unknown operators.
    pub fn total_stake(&self, operator: &OperatorId) -> Amount {
        self.stake(operator).map(StakeRecord::total).unwrap_or(Amount::ZERO)
    }

    /// Balance of one source, zero for unknown operators.
    pub fn balance(&self, operator: &OperatorId, source: StakeSource) -> Amount {
        self.stake(operator)
            .map(|s| s.balance(source))
            .unwrap_or(Amount::ZERO)
    }

    /// The authorization entry for a pair, empty if none.
    pub fn authorization(
        &self,
        operator: &OperatorId,
        application: &ApplicationId,
    ) -> AuthorizationEntry {
        self.participants
            .get(operator)
            .and_then(|p| p.authorizations.get(application))
            .copied()
            .unwrap_or_default()
    }

    /// Authorized amount for a pair.
    pub fn authorized(&self, operator: &OperatorId, application: &ApplicationId) -> Amount {
        self.authorization(operator, application).authorized()
    }

    /// Pending decrease for a pair.
    pub fn pending_decrease(
        &self,
        operator: &OperatorId,
        application: &ApplicationId,
    ) -> Amount {
        self.authorization(operator, application).pending_decrease()
    }

    /// Applications holding a nonzero authorization from an operator.
    pub fn authorized_applications(&self, operator: &OperatorId) -> Vec<(ApplicationId, Amount)> {
        self.participants
            .get(operator)
            .map(|p| {
                p.authorizations
                    .iter()
                    .filter(|(_, e)| !e.authorized().is_zero())
                    .map(|(id, e)| (id.clone(), e.authorized()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Stake an operator may still authorize.
    pub fn available_to_authorize(&self, operator: &OperatorId) -> Amount {
        self.participants
            .get(operator)
            .map(|p| invariant::available_to_authorize(p.stake.total(), p.authorized_amounts()))
            .unwrap_or(Amount::ZERO)
    }

    /// Portion of one source that must stay locked.
    pub fn min_locked(&self, operator: &OperatorId, source: StakeSource) -> Amount {
        self.participants
            .get(operator)
            .map(|p| {
                invariant::min_locked(
                    p.stake.balance(source),
                    p.stake.total(),
                    p.authorized_amounts(),
                )
            })
            .unwrap_or(Amount::ZERO)
    }

    /// Portion of one source that may be withdrawn.
    pub fn withdrawable(&self, operator: &OperatorId, source: StakeSource) -> Amount {
        self.participants
            .get(operator)
            .map(|p| {
                invariant::withdrawable(
                    p.stake.balance(source),
                    p.stake.total(),
                    p.authorized_amounts(),
                )
            })
            .unwrap_or(Amount::ZERO)
    }

    /// Whether total stake covers each of the operator's authorizations.
    pub fn is_collateralized(&self, operator: &OperatorId) -> bool {
        self.participants
            .get(operator)
            .map_or(true, |p| invariant::is_collateralized(p.stake.total(), p.authorized_amounts()))
    }

    /// An application's record.
    pub fn application(&self, application: &ApplicationId) -> Option<&ApplicationRecord> {
        self.applications.get(application)
    }

    /// Every application record, ordered by id.
    pub fn applications(&self) -> impl Iterator<Item = &ApplicationRecord> {
        self.applications.values()
    }

    /// Conversion ratio for a legacy system.
    pub fn conversion_ratio(&self, kind: LegacyKind) -> ConversionRatio {
        match kind {
            LegacyKind::A => self.config.legacy_a,
            LegacyKind::B => self.config.legacy_b,
        }
    }

    /// A clone of the full ledger state.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            governance: self.config.governance.clone(),
            minimum_commitment: self.config.minimum_commitment,
            authorization_ceiling: self.config.authorization_ceiling,
            native_custody: self.native_custody,
            participants: self.participants.clone(),
            applications: self.applications.clone(),
            event_count: self.events.len(),
            event_head: self.events.head(),
        }
    }

    // ── Shared checks ───────────────────────────────────────────────

    fn legacy_source(&self, kind: LegacyKind) -> Arc<dyn LegacySource> {
        match kind {
            LegacyKind::A => Arc::clone(&self.legacy_a),
            LegacyKind::B => Arc::clone(&self.legacy_b),
        }
    }

    fn staked(&self, operator: &OperatorId) -> Result<&Participant, LedgerError> {
        self.participants
            .get(operator)
            .ok_or_else(|| LedgerError::InvalidOperator {
                operator: operator.clone(),
                reason: InvalidOperatorReason::NotStaked,
            })
    }

    fn require_governance(&self, ctx: &TxContext) -> Result<(), LedgerError> {
        require_role(&ctx.caller, &self.config.governance, Role::Governance)
    }

    /// Approved and not disabled.
    fn enabled_application(&self, application: &ApplicationId) -> Result<(), LedgerError> {
        match self.applications.get(application) {
            Some(record) if record.status.is_disabled() => Err(LedgerError::ApplicationDisabled {
                application: application.clone(),
            }),
            Some(record) if record.status.is_approved() => Ok(()),
            _ => Err(LedgerError::ApplicationNotApproved {
                application: application.clone(),
            }),
        }
    }

    fn endpoint(&self, application: &ApplicationId) -> Result<Arc<dyn Application>, LedgerError> {
        self.endpoints
            .get(application)
            .map(Arc::clone)
            .ok_or_else(|| LedgerError::ApplicationNotApproved {
                application: application.clone(),
            })
    }

    fn prepare(&self, at: Tick, event: LedgerEvent) -> Result<EventRecord, LedgerError> {
        Ok(self.events.prepare(at, event)?)
    }

    fn append(&mut self, records: impl IntoIterator<Item = EventRecord>) -> Result<(), LedgerError> {
        for record in records {
            self.events.commit(record)?;
        }
        Ok(())
    }
}

fn require_role(caller: &Address, expected: &Address, role: Role) -> Result<(), LedgerError> {
    if caller == expected {
        Ok(())
    } else {
        Err(LedgerError::NotAuthorizedRole {
            caller: caller.clone(),
            required: role,
        })
    }
}

fn require_owner_or_operator(
    ctx: &TxContext,
    operator: &OperatorId,
    stake: &StakeRecord,
) -> Result<(), LedgerError> {
    if ctx.caller == stake.roles.owner || &ctx.caller == operator.address() {
        Ok(())
    } else {
        Err(LedgerError::NotAuthorizedRole {
            caller: ctx.caller.clone(),
            required: Role::OwnerOrOperator,
        })
    }
}

fn require_nonzero(address: &Address, role: Role) -> Result<(), LedgerError> {
    if address.is_zero() {
        Err(LedgerError::InvalidRoleAddress { role })
    } else {
        Ok(())
    }
}

fn callback_failed(application: &ApplicationId) -> impl FnOnce(ApplicationRejection) -> LedgerError + '_ {
    move |rejection| {
        warn!(%application, reason = %rejection, "application rejected notification");
        LedgerError::ApplicationCallbackFailed {
            application: application.clone(),
            reason: rejection.0,
        }
    }
}

fn state_error<'a>(
    operation: &'static str,
    operator: &'a OperatorId,
    application: &'a ApplicationId,
) -> impl FnOnce(StateError) -> LedgerError + 'a {
    move |err| match err {
        StateError::ZeroDecrease => LedgerError::ZeroAmount { operation },
        StateError::DecreaseExceedsAuthorized {
            requested,
            authorized,
        } => LedgerError::DecreaseExceedsAuthorized {
            operator: operator.clone(),
            application: application.clone(),
            requested,
            authorized,
        },
        StateError::NoDecreaseInProgress => LedgerError::NoDecreaseInProgress {
            operator: operator.clone(),
            application: application.clone(),
        },
        StateError::Arithmetic(e) => LedgerError::Arithmetic(e),
        other => LedgerError::State(other),
    }
}

fn rejected(operation: &'static str) -> impl FnOnce(LedgerError) -> LedgerError {
    move |err| {
        debug!(operation, kind = ?err.kind(), error = %err, "operation rejected");
        err
    }
}

#[cfg(test)]
mod fixture;
