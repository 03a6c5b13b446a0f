//! # Ledger Error Types
//!
//! Every operation either commits completely or fails with one of these
//! variants and leaves the ledger untouched. Variants carry the operator,
//! application, and amounts involved so a caller can decide whether to
//! retry with different parameters without consulting logs.
//!
//! [`LedgerError::kind`] maps each variant to a stable [`ErrorKind`] code for
//! callers that match on the failure class rather than the message.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use unistake_core::{Address, Amount, ApplicationId, ArithmeticError, OperatorId, Tick};
use unistake_state::StateError;

use crate::events::EventLogError;
use crate::legacy::LegacyKind;
use crate::stake::StakeSource;

/// A role a caller must hold for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The operator's owner.
    Owner,
    /// The operator's owner or the operator itself.
    OwnerOrOperator,
    /// The operator's authorizer.
    Authorizer,
    /// The operator's beneficiary.
    Beneficiary,
    /// The governance address.
    Governance,
    /// The application's panic address.
    PanicAddress,
    /// The application itself.
    Application,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Owner => "owner",
            Self::OwnerOrOperator => "owner or operator",
            Self::Authorizer => "authorizer",
            Self::Beneficiary => "beneficiary",
            Self::Governance => "governance",
            Self::PanicAddress => "panic address",
            Self::Application => "application",
        };
        f.write_str(s)
    }
}

/// Why an operator identity was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidOperatorReason {
    /// The operator is the zero address.
    ZeroAddress,
    /// A stake commitment of zero.
    ZeroAmount,
    /// A fresh commitment below the configured minimum.
    BelowMinimum {
        /// Committed amount.
        amount: Amount,
        /// Configured minimum.
        minimum: Amount,
    },
    /// The operator already belongs to a different owner in this ledger.
    ClaimedByOtherOwner {
        /// The current owner.
        owner: Address,
    },
    /// The operator is staked under a different owner in a legacy system.
    ClaimedInLegacy {
        /// The legacy system holding the claim.
        source: LegacyKind,
        /// The owner recorded there.
        owner: Address,
    },
    /// The operator has never staked.
    NotStaked,
}

impl std::fmt::Display for InvalidOperatorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroAddress => f.write_str("operator is the zero address"),
            Self::ZeroAmount => f.write_str("commitment amount is zero"),
            Self::BelowMinimum { amount, minimum } => {
                write!(f, "commitment {amount} is below minimum {minimum}")
            }
            Self::ClaimedByOtherOwner { owner } => write!(f, "already owned by {owner}"),
            Self::ClaimedInLegacy { source, owner } => {
                write!(f, "staked in legacy {source} by {owner}")
            }
            Self::NotStaked => f.write_str("operator has no stake record"),
        }
    }
}

/// Errors arising from ledger operations.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Zero, duplicate, or unknown operator, or a rejected commitment.
    #[error("invalid operator {operator}: {reason}")]
    InvalidOperator {
        /// The operator in question.
        operator: OperatorId,
        /// Why it was rejected.
        reason: InvalidOperatorReason,
    },

    /// The legacy system has nothing newer than the cached balance.
    #[error("nothing to sync for {operator} from legacy {legacy}: cached {cached}, observed {}", .observed.map(|a| a.to_string()).unwrap_or_else(|| "no record".to_string()))]
    NothingToSync {
        /// The operator in question.
        operator: OperatorId,
        /// The legacy system read.
        legacy: LegacyKind,
        /// Raw amount already cached.
        cached: Amount,
        /// Raw amount reported now, `None` if the system has no record.
        observed: Option<Amount>,
    },

    /// The legacy system has not made this ledger eligible for the operator.
    #[error("{operator} has not made this ledger eligible in legacy {legacy}")]
    LegacyNotEligible {
        /// The operator in question.
        operator: OperatorId,
        /// The legacy system read.
        legacy: LegacyKind,
    },

    /// The caller does not hold the required role.
    #[error("{caller} is not the {required}")]
    NotAuthorizedRole {
        /// Who called.
        caller: Address,
        /// Role the operation requires.
        required: Role,
    },

    /// A role would be assigned the zero address.
    #[error("{role} cannot be the zero address")]
    InvalidRoleAddress {
        /// The role being assigned.
        role: Role,
    },

    /// The application is unknown or was never approved.
    #[error("{application} is not approved")]
    ApplicationNotApproved {
        /// The application.
        application: ApplicationId,
    },

    /// The application is disabled.
    #[error("{application} is disabled")]
    ApplicationDisabled {
        /// The application.
        application: ApplicationId,
    },

    /// The application is approved and enabled already.
    #[error("{application} is already approved")]
    AlreadyApproved {
        /// The application.
        application: ApplicationId,
    },

    /// The operation requires a disabled application.
    #[error("{application} is not disabled")]
    ApplicationNotDisabled {
        /// The application.
        application: ApplicationId,
    },

    /// Authorizing another application would exceed the ceiling.
    #[error("{operator} already authorizes {authorized} applications (ceiling {ceiling})")]
    CeilingExceeded {
        /// The operator in question.
        operator: OperatorId,
        /// Applications currently holding a nonzero authorization.
        authorized: usize,
        /// Configured ceiling.
        ceiling: u32,
    },

    /// The increase would push total authorizations above total stake.
    #[error("{operator} cannot authorize {requested}: only {available} available")]
    InsufficientStakeToAuthorize {
        /// The operator in question.
        operator: OperatorId,
        /// Requested increase.
        requested: Amount,
        /// Stake not yet authorized to any application.
        available: Amount,
    },

    /// A decrease was requested for more than is authorized.
    #[error("{operator} cannot decrease {application} by {requested}: only {authorized} authorized")]
    DecreaseExceedsAuthorized {
        /// The operator in question.
        operator: OperatorId,
        /// The application.
        application: ApplicationId,
        /// Requested decrease.
        requested: Amount,
        /// Currently authorized.
        authorized: Amount,
    },

    /// Approval without a pending decrease.
    #[error("no decrease in progress for {operator} at {application}")]
    NoDecreaseInProgress {
        /// The operator in question.
        operator: OperatorId,
        /// The application.
        application: ApplicationId,
    },

    /// A zero amount where a positive one is required.
    #[error("{operation} requires a nonzero amount")]
    ZeroAmount {
        /// The rejected operation.
        operation: &'static str,
    },

    /// The withdrawal would leave some application under-collateralized.
    #[error("{operator} cannot unstake {requested} from {stake_source}: only {available} available")]
    UnstakeExceedsAvailable {
        /// The operator in question.
        operator: OperatorId,
        /// The balance source drawn from.
        stake_source: StakeSource,
        /// Requested withdrawal.
        requested: Amount,
        /// Withdrawable amount from that source.
        available: Amount,
    },

    /// Full unstake while an application still holds authorization.
    #[error("{operator} still authorizes {authorized} to {application}")]
    StakeStillAuthorized {
        /// The operator in question.
        operator: OperatorId,
        /// The application holding authorization.
        application: ApplicationId,
        /// Its authorized amount.
        authorized: Amount,
    },

    /// The minimum holding period since the last fresh commitment has not passed.
    #[error("{operator} committed at {committed_at}; holding period of {required} ticks not elapsed at {now}")]
    MinimumHoldingPeriodNotElapsed {
        /// The operator in question.
        operator: OperatorId,
        /// Time of the last fresh commitment.
        committed_at: Tick,
        /// Current time.
        now: Tick,
        /// Required holding period in ticks.
        required: u64,
    },

    /// The application rejected a notification; nothing was applied.
    #[error("{application} rejected notification: {reason}")]
    ApplicationCallbackFailed {
        /// The application.
        application: ApplicationId,
        /// The application's reason.
        reason: String,
    },

    /// Balance arithmetic left the representable range.
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),

    /// A lifecycle transition was rejected.
    #[error(transparent)]
    State(#[from] StateError),

    /// The event log rejected a record.
    #[error(transparent)]
    EventLog(#[from] EventLogError),
}

/// Stable classification of [`LedgerError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// [`LedgerError::InvalidOperator`].
    InvalidOperator,
    /// [`LedgerError::NothingToSync`].
    NothingToSync,
    /// [`LedgerError::LegacyNotEligible`].
    LegacyNotEligible,
    /// [`LedgerError::NotAuthorizedRole`].
    NotAuthorizedRole,
    /// [`LedgerError::InvalidRoleAddress`].
    InvalidRoleAddress,
    /// [`LedgerError::ApplicationNotApproved`].
    ApplicationNotApproved,
    /// [`LedgerError::ApplicationDisabled`].
    ApplicationDisabled,
    /// [`LedgerError::AlreadyApproved`].
    AlreadyApproved,
    /// [`LedgerError::ApplicationNotDisabled`].
    ApplicationNotDisabled,
    /// [`LedgerError::CeilingExceeded`].
    CeilingExceeded,
    /// [`LedgerError::InsufficientStakeToAuthorize`].
    InsufficientStakeToAuthorize,
    /// [`LedgerError::DecreaseExceedsAuthorized`].
    DecreaseExceedsAuthorized,
    /// [`LedgerError::NoDecreaseInProgress`].
    NoDecreaseInProgress,
    /// [`LedgerError::ZeroAmount`].
    ZeroAmount,
    /// [`LedgerError::UnstakeExceedsAvailable`].
    UnstakeExceedsAvailable,
    /// [`LedgerError::StakeStillAuthorized`].
    StakeStillAuthorized,
    /// [`LedgerError::MinimumHoldingPeriodNotElapsed`].
    MinimumHoldingPeriodNotElapsed,
    /// [`LedgerError::ApplicationCallbackFailed`].
    ApplicationCallbackFailed,
    /// [`LedgerError::Arithmetic`].
    Arithmetic,
    /// [`LedgerError::State`].
    State,
    /// [`LedgerError::EventLog`].
    EventLog,
}

impl LedgerError {
    /// The stable classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidOperator { .. } => ErrorKind::InvalidOperator,
            Self::NothingToSync { .. } => ErrorKind::NothingToSync,
            Self::LegacyNotEligible { .. } => ErrorKind::LegacyNotEligible,
            Self::NotAuthorizedRole { .. } => ErrorKind::NotAuthorizedRole,
            Self::InvalidRoleAddress { .. } => ErrorKind::InvalidRoleAddress,
            Self::ApplicationNotApproved { .. } => ErrorKind::ApplicationNotApproved,
            Self::ApplicationDisabled { .. } => ErrorKind::ApplicationDisabled,
            Self::AlreadyApproved { .. } => ErrorKind::AlreadyApproved,
            Self::ApplicationNotDisabled { .. } => ErrorKind::ApplicationNotDisabled,
            Self::CeilingExceeded { .. } => ErrorKind::CeilingExceeded,
            Self::InsufficientStakeToAuthorize { .. } => ErrorKind::InsufficientStakeToAuthorize,
            Self::DecreaseExceedsAuthorized { .. } => ErrorKind::DecreaseExceedsAuthorized,
            Self::NoDecreaseInProgress { .. } => ErrorKind::NoDecreaseInProgress,
            Self::ZeroAmount { .. } => ErrorKind::ZeroAmount,
            Self::UnstakeExceedsAvailable { .. } => ErrorKind::UnstakeExceedsAvailable,
            Self::StakeStillAuthorized { .. } => ErrorKind::StakeStillAuthorized,
            Self::MinimumHoldingPeriodNotElapsed { .. } => {
                ErrorKind::MinimumHoldingPeriodNotElapsed
            }
            Self::ApplicationCallbackFailed { .. } => ErrorKind::ApplicationCallbackFailed,
            Self::Arithmetic(_) => ErrorKind::Arithmetic,
            Self::State(_) => ErrorKind::State,
            Self::EventLog(_) => ErrorKind::EventLog,
        }
    }
}
