//! Shared setup for ledger unit tests.

use std::sync::Arc;

use unistake_core::{Address, Amount, ApplicationId, ConversionRatio, OperatorId, Tick};

use super::{StakeLedger, TxContext};
use crate::application::RecordingApplication;
use crate::config::LedgerConfig;
use crate::legacy::{InMemoryLegacySource, LegacyRecord};

pub fn addr(n: u64) -> Address {
    Address::from_low_u64(n)
}

pub fn amt(n: u128) -> Amount {
    Amount::new(n)
}

pub fn op(n: u64) -> OperatorId {
    OperatorId::new(addr(0x0100 + n))
}

pub fn app(n: u64) -> ApplicationId {
    ApplicationId::new(addr(0x0a00 + n))
}

pub fn owner() -> Address {
    addr(0x11)
}

pub fn authorizer() -> Address {
    addr(0x22)
}

pub fn governance() -> Address {
    addr(0x90)
}

pub fn panic_address() -> Address {
    addr(0xdead)
}

pub fn ledger_address() -> Address {
    addr(0x1ed)
}

pub fn legacy_record(owner: Address, amount: u128) -> LegacyRecord {
    LegacyRecord {
        owner: owner.clone(),
        beneficiary: owner.clone(),
        authorizer: owner,
        amount: Amount::new(amount),
    }
}

pub fn config() -> LedgerConfig {
    LedgerConfig {
        ledger_address: ledger_address(),
        governance: governance(),
        minimum_commitment: Amount::new(40_000),
        authorization_ceiling: 2,
        minimum_holding_period: 24,
        legacy_a: ConversionRatio::new(1_450_000_000_000_000_000, 1_000_000_000_000_000).unwrap(),
        legacy_b: ConversionRatio::new(1, 1).unwrap(),
    }
}

pub struct Fixture {
    pub ledger: StakeLedger,
    pub legacy_a: InMemoryLegacySource,
    pub legacy_b: InMemoryLegacySource,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(config())
    }

    pub fn with_config(config: LedgerConfig) -> Self {
        let legacy_a = InMemoryLegacySource::new();
        let legacy_b = InMemoryLegacySource::new();
        let ledger = StakeLedger::new(
            config,
            Arc::new(legacy_a.clone()),
            Arc::new(legacy_b.clone()),
        )
        .unwrap();
        Self {
            ledger,
            legacy_a,
            legacy_b,
        }
    }

    pub fn ctx(&self, caller: Address, at: u64) -> TxContext {
        TxContext::new(caller, Tick::new(at))
    }

    pub fn owner_at(&self, at: u64) -> TxContext {
        self.ctx(owner(), at)
    }

    pub fn authorizer_at(&self, at: u64) -> TxContext {
        self.ctx(authorizer(), at)
    }

    pub fn gov_at(&self, at: u64) -> TxContext {
        self.ctx(governance(), at)
    }

    /// Fresh native stake by `owner()` with `authorizer()` as authorizer.
    pub fn stake(&mut self, operator: &OperatorId, amount: u128, at: u64) {
        let ctx = self.owner_at(at);
        self.ledger
            .commit(&ctx, operator, None, Some(authorizer()), Amount::new(amount))
            .unwrap();
    }

    /// Approve `app(n)` with a recording endpoint and `panic_address()`.
    pub fn approve(&mut self, n: u64) -> Arc<RecordingApplication> {
        let endpoint = Arc::new(RecordingApplication::new(app(n)));
        let ctx = self.gov_at(0);
        self.ledger
            .approve_application(&ctx, endpoint.clone())
            .unwrap();
        self.ledger
            .set_panic_button(&ctx, &app(n), panic_address())
            .unwrap();
        endpoint
    }

    pub fn authorize(&mut self, operator: &OperatorId, n: u64, amount: u128) {
        let ctx = self.authorizer_at(1);
        self.ledger
            .increase_authorization(&ctx, operator, &app(n), Amount::new(amount))
            .unwrap();
    }
}
