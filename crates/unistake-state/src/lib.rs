//! # unistake-state: Ledger State Machines
//!
//! The two lifecycles that the ledger drives per record:
//!
//! - **Authorization** (`authorization.rs`): one entry per
//!   (operator, application) pair. `Stable → DecreasePending → Stable`,
//!   with the request side driven by the operator's authorizer and the
//!   approval side driven by the application itself.
//!
//! - **Application** (`application.rs`): `NotApproved → Approved ⇄ Disabled`,
//!   with every transition recorded for audit.
//!
//! ## Design
//!
//! States are plain enums with an explicit `valid_transitions()` table so
//! the transition matrix can be tested exhaustively. The machines hold no
//! references to the ledger; the ledger decides *who* may call a transition
//! and these types decide *whether* the transition is legal.

pub mod application;
pub mod authorization;
pub mod error;

pub use application::{ApplicationRecord, ApplicationStatus, ApplicationTransition};
pub use authorization::{
    AuthorizationChange, AuthorizationEntry, DecreaseRequest, DecreaseState,
};
pub use error::StateError;
