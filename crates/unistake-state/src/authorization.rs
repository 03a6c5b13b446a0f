//! # Two-Phase Authorization Decrease
//!
//! An application may hold derived state keyed by the amount authorized to
//! it (duty assignments, bonded capacity). Reducing that amount therefore
//! happens in two steps: the authorizer *requests* a decrease, the
//! application settles its own bookkeeping and then *approves* it. Only the
//! approval moves the authorized amount.
//!
//! ## States
//!
//! ```text
//!            request_decrease()                 approve_decrease()
//! STABLE ───────────────────────▶ DECREASE_PENDING ─────────────────▶ STABLE
//!                                   │        ▲
//!                                   └────────┘
//!                             request_decrease()
//!                         (latest request supersedes)
//! ```
//!
//! ## Invariant
//!
//! `pending_decrease <= authorized` at all times. Requests are validated
//! against the current authorization, increases only grow `authorized`, and
//! approval subtracts exactly the pending amount.

use serde::{Deserialize, Serialize};

use unistake_core::Amount;

use crate::error::StateError;

/// Position of an authorization entry in the decrease protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecreaseState {
    /// No decrease pending.
    Stable,
    /// A decrease has been requested and awaits the application's approval.
    DecreasePending,
}

impl DecreaseState {
    /// The canonical state name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stable => "STABLE",
            Self::DecreasePending => "DECREASE_PENDING",
        }
    }

    /// States reachable in one step.
    pub fn valid_transitions(&self) -> &'static [DecreaseState] {
        match self {
            Self::Stable => &[Self::DecreasePending],
            Self::DecreasePending => &[Self::Stable, Self::DecreasePending],
        }
    }
}

impl std::fmt::Display for DecreaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A change of authorized amount, reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationChange {
    /// Authorized amount before the change.
    pub from: Amount,
    /// Authorized amount after the change.
    pub to: Amount,
}

/// A registered decrease request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecreaseRequest {
    /// Authorized amount at request time.
    pub from: Amount,
    /// Authorized amount once the request is approved.
    pub to: Amount,
    /// Pending amount this request replaced, zero if none.
    pub superseded: Amount,
}

/// Authorization held by one operator for one application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationEntry {
    authorized: Amount,
    pending_decrease: Amount,
}

impl AuthorizationEntry {
    /// Currently authorized amount.
    pub fn authorized(&self) -> Amount {
        self.authorized
    }

    /// Amount awaiting the application's approval.
    pub fn pending_decrease(&self) -> Amount {
        self.pending_decrease
    }

    /// Current protocol state.
    pub fn state(&self) -> DecreaseState {
        if self.pending_decrease.is_zero() {
            DecreaseState::Stable
        } else {
            DecreaseState::DecreasePending
        }
    }

    /// Whether the entry holds neither authorization nor a pending decrease.
    pub fn is_empty(&self) -> bool {
        self.authorized.is_zero() && self.pending_decrease.is_zero()
    }

    /// Preview an increase without applying it.
    pub fn preview_increase(&self, amount: Amount) -> Result<AuthorizationChange, StateError> {
        Ok(AuthorizationChange {
            from: self.authorized,
            to: self.authorized.checked_add(amount)?,
        })
    }

    /// Grow the authorized amount. A pending decrease is left untouched.
    pub fn increase(&mut self, amount: Amount) -> Result<AuthorizationChange, StateError> {
        let change = self.preview_increase(amount)?;
        self.authorized = change.to;
        Ok(change)
    }

    /// Preview a decrease request without applying it.
    ///
    /// # Errors
    ///
    /// [`StateError::ZeroDecrease`] for a zero amount and
    /// [`StateError::DecreaseExceedsAuthorized`] when `amount` is larger
    /// than the current authorization.
    pub fn preview_decrease_request(&self, amount: Amount) -> Result<DecreaseRequest, StateError> {
        if amount.is_zero() {
            return Err(StateError::ZeroDecrease);
        }
        let to = self
            .authorized
            .checked_sub(amount)
            .map_err(|_| StateError::DecreaseExceedsAuthorized {
                requested: amount,
                authorized: self.authorized,
            })?;
        Ok(DecreaseRequest {
            from: self.authorized,
            to,
            superseded: self.pending_decrease,
        })
    }

    /// Register a decrease request, replacing any pending one.
    pub fn request_decrease(&mut self, amount: Amount) -> Result<DecreaseRequest, StateError> {
        let request = self.preview_decrease_request(amount)?;
        self.pending_decrease = amount;
        Ok(request)
    }

    /// Preview the approval of the pending decrease.
    pub fn preview_approve_decrease(&self) -> Result<AuthorizationChange, StateError> {
        if self.pending_decrease.is_zero() {
            return Err(StateError::NoDecreaseInProgress);
        }
        Ok(AuthorizationChange {
            from: self.authorized,
            to: self.authorized.checked_sub(self.pending_decrease)?,
        })
    }

    /// Apply the pending decrease and return to [`DecreaseState::Stable`].
    pub fn approve_decrease(&mut self) -> Result<AuthorizationChange, StateError> {
        let change = self.preview_approve_decrease()?;
        self.authorized = change.to;
        self.pending_decrease = Amount::ZERO;
        Ok(change)
    }

    /// Drop the authorization and any pending decrease unconditionally.
    pub fn clear(&mut self) -> AuthorizationChange {
        let change = AuthorizationChange {
            from: self.authorized,
            to: Amount::ZERO,
        };
        self.authorized = Amount::ZERO;
        self.pending_decrease = Amount::ZERO;
        change
    }
}
