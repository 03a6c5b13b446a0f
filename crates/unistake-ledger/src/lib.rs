//! # unistake-ledger: Unified Stake Ledger
//!
//! One ledger for operator stake from three sources: native tokens held in
//! custody here, and read-only mirrors of two legacy staking systems.
//! Applications receive authorizations against that combined stake; the
//! ledger guarantees every authorization stays covered.
//!
//! ## Modules
//!
//! - `stake`: per-operator balances and roles.
//! - `legacy`: the read-only port to the legacy systems.
//! - `application`: the notification port to applications.
//! - `invariant`: slack arithmetic behind every withdrawal bound.
//! - `events`: the hash-chained event log.
//! - `config`: construction parameters and YAML loading.
//! - `ledger`: the [`StakeLedger`] aggregate and its operations.
//!
//! ## Guarantees
//!
//! For every operator and application, `authorized <= total stake`. The
//! sum of authorizations never exceeds total stake at the moment one is
//! increased. An operation that returns an error has changed nothing.
//!
//! Lifecycle machines for authorizations and applications live in
//! `unistake-state`; identifiers, amounts, and the conversion oracle in
//! `unistake-core`.

#![deny(missing_docs)]

pub mod application;
pub mod config;
pub mod error;
pub mod events;
pub mod invariant;
pub mod ledger;
pub mod legacy;
pub mod stake;

pub use application::{Application, ApplicationRejection, Notification, RecordingApplication};
pub use config::{ConfigError, LedgerConfig, DEFAULT_MINIMUM_HOLDING_PERIOD};
pub use error::{ErrorKind, InvalidOperatorReason, LedgerError, Role};
pub use events::{EventLog, EventLogError, EventRecord, LedgerEvent};
pub use ledger::{LedgerSnapshot, Participant, StakeLedger, TxContext};
pub use legacy::{InMemoryLegacySource, LegacyKind, LegacyRecord, LegacySource};
pub use stake::{LegacyBalance, Roles, StakeRecord, StakeSource};
