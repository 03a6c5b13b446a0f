//! # State Machine Errors

use thiserror::Error;

use unistake_core::{Amount, ArithmeticError};

/// A state machine rejected a transition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// The target state is not reachable from the current state.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        /// Current state name.
        from: &'static str,
        /// Attempted target state name.
        to: &'static str,
    },

    /// A decrease of zero was requested.
    #[error("decrease amount must be nonzero")]
    ZeroDecrease,

    /// The requested decrease is larger than the current authorization.
    #[error("decrease of {requested} exceeds authorized amount {authorized}")]
    DecreaseExceedsAuthorized {
        /// Requested decrease.
        requested: Amount,
        /// Currently authorized.
        authorized: Amount,
    },

    /// Approval was attempted with no pending decrease.
    #[error("no authorization decrease in progress")]
    NoDecreaseInProgress,

    /// Authorized amount left the representable range.
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = StateError::InvalidTransition {
            from: "NOT_APPROVED",
            to: "DISABLED",
        };
        assert_eq!(
            format!("{err}"),
            "invalid transition from NOT_APPROVED to DISABLED"
        );
        let err = StateError::DecreaseExceedsAuthorized {
            requested: Amount::new(9),
            authorized: Amount::new(4),
        };
        assert!(format!("{err}").contains("9"));
        assert!(format!("{err}").contains("4"));
    }
}
