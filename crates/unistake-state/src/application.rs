//! # Application Lifecycle
//!
//! Applications are registered by governance and toggled between enabled
//! and disabled; records are never deleted.
//!
//! ```text
//! NOT_APPROVED ─approve()──▶ APPROVED ─disable()──▶ DISABLED
//!                               ▲                       │
//!                               └──────approve()────────┘
//! ```
//!
//! Re-approval of a disabled application keeps its panic address; the
//! ledger keeps its authorizations.

use serde::{Deserialize, Serialize};

use unistake_core::{Address, ApplicationId, Tick};

use crate::error::StateError;

/// Approval status of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    /// Known to the ledger but never approved.
    NotApproved,
    /// Approved and enabled.
    Approved,
    /// Approved once, now disabled by its panic address.
    Disabled,
}

impl ApplicationStatus {
    /// The canonical status name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotApproved => "NOT_APPROVED",
            Self::Approved => "APPROVED",
            Self::Disabled => "DISABLED",
        }
    }

    /// Statuses reachable in one step.
    pub fn valid_transitions(&self) -> &'static [ApplicationStatus] {
        match self {
            Self::NotApproved => &[Self::Approved],
            Self::Approved => &[Self::Disabled],
            Self::Disabled => &[Self::Approved],
        }
    }

    /// Whether governance has ever approved the application.
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved | Self::Disabled)
    }

    /// Whether the application is disabled.
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }

    fn transition_to(&self, to: ApplicationStatus) -> Result<(), StateError> {
        if self.valid_transitions().contains(&to) {
            Ok(())
        } else {
            Err(StateError::InvalidTransition {
                from: self.as_str(),
                to: to.as_str(),
            })
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationTransition {
    /// Status before.
    pub from: ApplicationStatus,
    /// Status after.
    pub to: ApplicationStatus,
    /// Address that triggered the change.
    pub by: Address,
    /// When it happened.
    pub at: Tick,
}

/// Ledger-side record of an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    /// The application's identity.
    pub id: ApplicationId,
    /// Current status.
    pub status: ApplicationStatus,
    /// Address allowed to disable the application instantly.
    pub panic_address: Option<Address>,
    /// Status history, oldest first.
    pub transitions: Vec<ApplicationTransition>,
}

impl ApplicationRecord {
    /// A fresh, unapproved record.
    pub fn new(id: ApplicationId) -> Self {
        Self {
            id,
            status: ApplicationStatus::NotApproved,
            panic_address: None,
            transitions: Vec::new(),
        }
    }

    /// Move to [`ApplicationStatus::Approved`].
    ///
    /// # Errors
    ///
    /// [`StateError::InvalidTransition`] if already approved and enabled.
    pub fn approve(&mut self, by: Address, at: Tick) -> Result<(), StateError> {
        self.transition(ApplicationStatus::Approved, by, at)
    }

    /// Move to [`ApplicationStatus::Disabled`].
    ///
    /// # Errors
    ///
    /// [`StateError::InvalidTransition`] unless currently approved and enabled.
    pub fn disable(&mut self, by: Address, at: Tick) -> Result<(), StateError> {
        self.transition(ApplicationStatus::Disabled, by, at)
    }

    /// Replace the panic address.
    pub fn set_panic_address(&mut self, panic_address: Address) {
        self.panic_address = Some(panic_address);
    }

    fn transition(&mut self, to: ApplicationStatus, by: Address, at: Tick) -> Result<(), StateError> {
        self.status.transition_to(to)?;
        self.transitions.push(ApplicationTransition {
            from: self.status,
            to,
            by,
            at,
        });
        self.status = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gov() -> Address {
        Address::from_low_u64(0x90)
    }

    fn record() -> ApplicationRecord {
        ApplicationRecord::new(ApplicationId::new(Address::from_low_u64(0xa1)))
    }

    #[test]
    fn transition_matrix_exhaustive() {
        let all = [
            ApplicationStatus::NotApproved,
            ApplicationStatus::Approved,
            ApplicationStatus::Disabled,
        ];
        let expected = [
            (ApplicationStatus::NotApproved, ApplicationStatus::Approved),
            (ApplicationStatus::Approved, ApplicationStatus::Disabled),
            (ApplicationStatus::Disabled, ApplicationStatus::Approved),
        ];
        for from in &all {
            for to in &all {
                let valid = from.valid_transitions().contains(to);
                assert_eq!(
                    valid,
                    expected.contains(&(*from, *to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn approve_disable_reapprove_keeps_panic_address() {
        let mut r = record();
        r.approve(gov(), Tick::new(1)).unwrap();
        r.set_panic_address(Address::from_low_u64(0xdead));
        r.disable(Address::from_low_u64(0xdead), Tick::new(2)).unwrap();
        assert!(r.status.is_disabled());
        assert!(r.status.is_approved());
        r.approve(gov(), Tick::new(3)).unwrap();
        assert_eq!(r.status, ApplicationStatus::Approved);
        assert_eq!(r.panic_address, Some(Address::from_low_u64(0xdead)));
        assert_eq!(r.transitions.len(), 3);
        assert_eq!(r.transitions[1].from, ApplicationStatus::Approved);
        assert_eq!(r.transitions[1].to, ApplicationStatus::Disabled);
    }

    #[test]
    fn double_approve_rejected() {
        let mut r = record();
        r.approve(gov(), Tick::new(1)).unwrap();
        let err = r.approve(gov(), Tick::new(2)).unwrap_err();
        assert_eq!(
            err,
            StateError::InvalidTransition {
                from: "APPROVED",
                to: "APPROVED"
            }
        );
        assert_eq!(r.transitions.len(), 1);
    }

    #[test]
    fn cannot_disable_unapproved() {
        let mut r = record();
        assert!(r.disable(gov(), Tick::new(1)).is_err());
        assert_eq!(r.status, ApplicationStatus::NotApproved);
    }

    #[test]
    fn record_serialization_roundtrip() {
        let mut r = record();
        r.approve(gov(), Tick::new(4)).unwrap();
        let json = serde_json::to_string(&r).unwrap();
        let back: ApplicationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
