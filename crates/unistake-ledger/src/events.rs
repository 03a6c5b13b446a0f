//! # Ledger Event Log
//!
//! Every successful mutation appends one [`LedgerEvent`] per observable
//! change. Records are hash-chained:
//!
//! ```text
//! digest(n) = sha256(digest(n-1) || json(sequence, at, event))
//! digest(-1) = 0x00..00
//! ```
//!
//! so an exported log can be checked for gaps, reordering, and edits with
//! [`EventLog::verify`].
//!
//! Records are built with [`EventLog::prepare`] before the ledger mutates
//! anything and appended with [`EventLog::commit`] afterwards. Encoding is
//! the only fallible step and it happens up front.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use unistake_core::{Address, Amount, ApplicationId, ChainDigest, OperatorId, Tick};

use crate::legacy::LegacyKind;
use crate::stake::StakeSource;

/// Errors from building or checking the event chain.
#[derive(Error, Debug)]
pub enum EventLogError {
    /// The event could not be serialized.
    #[error("cannot encode event #{sequence}: {source}")]
    Encoding {
        /// Sequence number of the event.
        sequence: u64,
        /// Underlying serializer error.
        source: serde_json::Error,
    },

    /// A prepared record no longer follows the chain head.
    #[error("record #{actual} does not follow head (expected #{expected})")]
    SequenceMismatch {
        /// Next expected sequence number.
        expected: u64,
        /// Sequence number of the record.
        actual: u64,
    },

    /// A record's digest does not match its recomputed value.
    #[error("digest mismatch at record #{sequence}: stored {stored}, computed {computed}")]
    DigestMismatch {
        /// Sequence number of the record.
        sequence: u64,
        /// Digest held by the record.
        stored: ChainDigest,
        /// Digest recomputed from its predecessor and payload.
        computed: ChainDigest,
    },
}

/// Something that happened in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// Native tokens committed.
    StakeCommitted {
        /// The operator.
        operator: OperatorId,
        /// Owner at the time of the commitment.
        owner: Address,
        /// Beneficiary at the time of the commitment.
        beneficiary: Address,
        /// Authorizer at the time of the commitment.
        authorizer: Address,
        /// Amount committed.
        amount: Amount,
        /// Whether the native balance was zero before, restarting the clock.
        fresh: bool,
    },
    /// A legacy balance was mirrored.
    LegacySynced {
        /// The operator.
        operator: OperatorId,
        /// The legacy system.
        source: LegacyKind,
        /// Raw amount observed.
        raw: Amount,
        /// Common-unit amount credited.
        converted: Amount,
        /// Raw remainder left unconverted.
        remainder: Amount,
    },
    /// Authorization grew.
    AuthorizationIncreased {
        /// The operator.
        operator: OperatorId,
        /// The application.
        application: ApplicationId,
        /// Authorized before.
        from: Amount,
        /// Authorized after.
        to: Amount,
    },
    /// A decrease was requested.
    AuthorizationDecreaseRequested {
        /// The operator.
        operator: OperatorId,
        /// The application.
        application: ApplicationId,
        /// Authorized at request time.
        from: Amount,
        /// Authorized once approved.
        to: Amount,
    },
    /// A decrease was approved by the application.
    AuthorizationDecreaseApproved {
        /// The operator.
        operator: OperatorId,
        /// The application.
        application: ApplicationId,
        /// Authorized before.
        from: Amount,
        /// Authorized after.
        to: Amount,
    },
    /// Authorization at a disabled application was dropped.
    AuthorizationForceDecreased {
        /// The operator.
        operator: OperatorId,
        /// The application.
        application: ApplicationId,
        /// Authorized before.
        from: Amount,
        /// Authorized after.
        to: Amount,
    },
    /// Stake left one source.
    Unstaked {
        /// The operator.
        operator: OperatorId,
        /// The source drawn from.
        source: StakeSource,
        /// Amount released, in common units.
        amount: Amount,
        /// Who receives released custody tokens. `None` for legacy mirrors.
        recipient: Option<Address>,
    },
    /// All stake left every source.
    UnstakedAll {
        /// The operator.
        operator: OperatorId,
        /// Native amount returned.
        native: Amount,
        /// Mirror of legacy A released.
        legacy_a: Amount,
        /// Mirror of legacy B released.
        legacy_b: Amount,
        /// Recipient of the native amount.
        recipient: Address,
    },
    /// Governance approved or re-approved an application.
    ApplicationApproved {
        /// The application.
        application: ApplicationId,
    },
    /// An application was disabled through its panic address.
    ApplicationDisabled {
        /// The application.
        application: ApplicationId,
        /// The panic address that acted.
        by: Address,
    },
    /// An application's panic address changed.
    PanicButtonSet {
        /// The application.
        application: ApplicationId,
        /// New panic address.
        panic_address: Address,
    },
    /// The per-operator application ceiling changed.
    AuthorizationCeilingSet {
        /// New ceiling.
        ceiling: u32,
    },
    /// The minimum fresh commitment changed.
    MinimumCommitmentSet {
        /// New minimum.
        amount: Amount,
    },
    /// Governance moved to a new address.
    GovernanceTransferred {
        /// Previous governance.
        from: Address,
        /// New governance.
        to: Address,
    },
}

impl LedgerEvent {
    /// Short event name, matching the serialized `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StakeCommitted { .. } => "stake_committed",
            Self::LegacySynced { .. } => "legacy_synced",
            Self::AuthorizationIncreased { .. } => "authorization_increased",
            Self::AuthorizationDecreaseRequested { .. } => "authorization_decrease_requested",
            Self::AuthorizationDecreaseApproved { .. } => "authorization_decrease_approved",
            Self::AuthorizationForceDecreased { .. } => "authorization_force_decreased",
            Self::Unstaked { .. } => "unstaked",
            Self::UnstakedAll { .. } => "unstaked_all",
            Self::ApplicationApproved { .. } => "application_approved",
            Self::ApplicationDisabled { .. } => "application_disabled",
            Self::PanicButtonSet { .. } => "panic_button_set",
            Self::AuthorizationCeilingSet { .. } => "authorization_ceiling_set",
            Self::MinimumCommitmentSet { .. } => "minimum_commitment_set",
            Self::GovernanceTransferred { .. } => "governance_transferred",
        }
    }
}

/// One link in the event chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in the log, from zero.
    pub sequence: u64,
    /// When the event happened.
    pub at: Tick,
    /// The event.
    pub event: LedgerEvent,
    /// Chain digest through this record.
    pub digest: ChainDigest,
}

#[derive(Serialize)]
struct Payload<'a> {
    sequence: u64,
    at: Tick,
    event: &'a LedgerEvent,
}

fn link(
    prev: &ChainDigest,
    sequence: u64,
    at: Tick,
    event: &LedgerEvent,
) -> Result<ChainDigest, EventLogError> {
    let bytes = serde_json::to_vec(&Payload { sequence, at, event })
        .map_err(|source| EventLogError::Encoding { sequence, source })?;
    Ok(prev.chain(&bytes))
}

/// Append-only, hash-chained event log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Digest of the last record, [`ChainDigest::GENESIS`] when empty.
    pub fn head(&self) -> ChainDigest {
        self.records
            .last()
            .map(|r| r.digest)
            .unwrap_or(ChainDigest::GENESIS)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records from `sequence` onwards.
    pub fn since(&self, sequence: u64) -> &[EventRecord] {
        let start = usize::try_from(sequence)
            .unwrap_or(usize::MAX)
            .min(self.records.len());
        &self.records[start..]
    }

    /// Build the next record without appending it.
    pub fn prepare(&self, at: Tick, event: LedgerEvent) -> Result<EventRecord, EventLogError> {
        self.prepare_after(&self.head(), self.records.len() as u64, at, event)
    }

    /// Build several consecutive records without appending them.
    pub fn prepare_batch(
        &self,
        at: Tick,
        events: Vec<LedgerEvent>,
    ) -> Result<Vec<EventRecord>, EventLogError> {
        let mut head = self.head();
        let mut sequence = self.records.len() as u64;
        let mut out = Vec::with_capacity(events.len());
        for event in events {
            let record = self.prepare_after(&head, sequence, at, event)?;
            head = record.digest;
            sequence += 1;
            out.push(record);
        }
        Ok(out)
    }

    fn prepare_after(
        &self,
        head: &ChainDigest,
        sequence: u64,
        at: Tick,
        event: LedgerEvent,
    ) -> Result<EventRecord, EventLogError> {
        let digest = link(head, sequence, at, &event)?;
        Ok(EventRecord {
            sequence,
            at,
            event,
            digest,
        })
    }

    /// Append a record built by [`prepare`](Self::prepare).
    ///
    /// # Errors
    ///
    /// [`EventLogError::SequenceMismatch`] if another record was appended
    /// since it was prepared.
    pub fn commit(&mut self, record: EventRecord) -> Result<(), EventLogError> {
        let expected = self.records.len() as u64;
        if record.sequence != expected {
            return Err(EventLogError::SequenceMismatch {
                expected,
                actual: record.sequence,
            });
        }
        self.records.push(record);
        Ok(())
    }

    /// Recompute the chain and compare every stored digest.
    pub fn verify(&self) -> Result<(), EventLogError> {
        let mut head = ChainDigest::GENESIS;
        for (index, record) in self.records.iter().enumerate() {
            let expected = index as u64;
            if record.sequence != expected {
                return Err(EventLogError::SequenceMismatch {
                    expected,
                    actual: record.sequence,
                });
            }
            let computed = link(&head, record.sequence, record.at, &record.event)?;
            if computed != record.digest {
                return Err(EventLogError::DigestMismatch {
                    sequence: record.sequence,
                    stored: record.digest,
                    computed,
                });
            }
            head = computed;
        }
        Ok(())
    }
}
