//! # Scenario Model and Runner
//!
//! A scenario is a YAML document describing a ledger configuration, the
//! applications to register, the initial state of both legacy systems,
//! and an ordered list of steps. The runner replays the steps against an
//! in-memory ledger and reports each outcome.
//!
//! ```yaml
//! config:
//!   ledger_address: "0x00000000000000000000000000000000000001ed"
//!   governance: "0x0000000000000000000000000000000000000090"
//!   authorization_ceiling: 1
//!   legacy_a: { ratio: 1, divisor: 1 }
//!   legacy_b: { ratio: 1, divisor: 1 }
//! applications:
//!   - id: "0x0000000000000000000000000000000000000a01"
//!     panic_address: "0x000000000000000000000000000000000000dead"
//! steps:
//!   - { action: commit, caller: "0x…11", operator: "0x…101", amount: "5" }
//!   - { action: advance, ticks: 3 }
//!   - { action: unstake_native, caller: "0x…11", operator: "0x…101", amount: "1",
//!       expect: unstake_exceeds_available }
//! ```
//!
//! A step with `expect` must fail with that error kind; a step without it
//! must succeed. Either mismatch is reported, and the run carries on.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use unistake_core::{Address, Amount, ApplicationId, OperatorId, Tick};
use unistake_ledger::{
    ErrorKind, EventRecord, InMemoryLegacySource, LedgerConfig, LedgerError, LedgerSnapshot,
    LegacyKind, LegacyRecord, RecordingApplication, StakeLedger, TxContext,
};

/// A complete scenario file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Ledger configuration. Falls back to the `--config` file when absent.
    #[serde(default)]
    pub config: Option<LedgerConfig>,
    /// Applications approved by governance before the first step.
    #[serde(default)]
    pub applications: Vec<ApplicationSetup>,
    /// Initial legacy records.
    #[serde(default)]
    pub legacy: Vec<LegacySetup>,
    /// Steps, in order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// An application to register up front.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplicationSetup {
    /// Application address.
    pub id: Address,
    /// Panic address, set right after approval.
    #[serde(default)]
    pub panic_address: Option<Address>,
}

/// A legacy record present before the first step.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LegacySetup {
    /// Which legacy system.
    pub source: LegacyKind,
    /// The operator.
    pub operator: Address,
    /// Owner in the legacy system.
    pub owner: Address,
    /// Beneficiary, defaults to the owner.
    #[serde(default)]
    pub beneficiary: Option<Address>,
    /// Authorizer, defaults to the owner.
    #[serde(default)]
    pub authorizer: Option<Address>,
    /// Raw amount in legacy units.
    pub amount: Amount,
    /// Whether this ledger is eligible for the operator.
    #[serde(default)]
    pub eligible: bool,
}

/// One scenario step.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    /// Calling address. Required for ledger operations.
    #[serde(default)]
    pub caller: Option<Address>,
    /// Error kind the step must fail with.
    #[serde(default)]
    pub expect: Option<ErrorKind>,
    /// What to do.
    #[serde(flatten)]
    pub action: Action,
}

/// A scenario action.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Move the clock forward.
    Advance {
        /// Ticks to add.
        ticks: u64,
    },
    /// Insert or replace a legacy record.
    SetLegacyStake(LegacySetup),
    /// Make a recording application reject (or accept again).
    SetApplicationRejection {
        /// The application.
        application: Address,
        /// Rejection reason; `None` accepts again.
        #[serde(default)]
        reason: Option<String>,
    },
    /// Native commitment.
    Commit {
        /// The operator.
        operator: Address,
        /// Beneficiary on a fresh commitment.
        #[serde(default)]
        beneficiary: Option<Address>,
        /// Authorizer on a fresh commitment.
        #[serde(default)]
        authorizer: Option<Address>,
        /// Amount committed.
        amount: Amount,
    },
    /// Mirror a legacy balance.
    SyncLegacy {
        /// Which legacy system.
        source: LegacyKind,
        /// The operator.
        operator: Address,
    },
    /// Grow an authorization.
    IncreaseAuthorization {
        /// The operator.
        operator: Address,
        /// The application.
        application: Address,
        /// Increase.
        amount: Amount,
    },
    /// Request a decrease; omit `amount` for a full release.
    RequestDecrease {
        /// The operator.
        operator: Address,
        /// The application.
        application: Address,
        /// Decrease, or everything when absent.
        #[serde(default)]
        amount: Option<Amount>,
    },
    /// Request full release from every application.
    RequestDecreaseAll {
        /// The operator.
        operator: Address,
    },
    /// Approve a pending decrease; the caller is the application.
    ApproveDecrease {
        /// The operator.
        operator: Address,
    },
    /// Drop authorization at a disabled application.
    ForceDecrease {
        /// The operator.
        operator: Address,
        /// The application.
        application: Address,
    },
    /// Withdraw native stake.
    UnstakeNative {
        /// The operator.
        operator: Address,
        /// Amount withdrawn.
        amount: Amount,
    },
    /// Release a legacy mirror.
    UnstakeLegacy {
        /// Which legacy system.
        source: LegacyKind,
        /// The operator.
        operator: Address,
    },
    /// Release everything.
    UnstakeAll {
        /// The operator.
        operator: Address,
    },
    /// Approve or re-enable an application with a recording endpoint.
    ApproveApplication {
        /// The application.
        application: Address,
    },
    /// Set an application's panic address.
    SetPanicButton {
        /// The application.
        application: Address,
        /// New panic address.
        panic_address: Address,
    },
    /// Disable an application.
    DisableApplication {
        /// The application.
        application: Address,
    },
    /// Change the per-operator application ceiling.
    SetAuthorizationCeiling {
        /// New ceiling.
        ceiling: u32,
    },
    /// Change the minimum fresh commitment.
    SetMinimumCommitment {
        /// New minimum.
        amount: Amount,
    },
    /// Hand governance to another address.
    TransferGovernance {
        /// New governance.
        to: Address,
    },
}

impl Action {
    /// The action's name as written in scenario files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Advance { .. } => "advance",
            Self::SetLegacyStake(_) => "set_legacy_stake",
            Self::SetApplicationRejection { .. } => "set_application_rejection",
            Self::Commit { .. } => "commit",
            Self::SyncLegacy { .. } => "sync_legacy",
            Self::IncreaseAuthorization { .. } => "increase_authorization",
            Self::RequestDecrease { .. } => "request_decrease",
            Self::RequestDecreaseAll { .. } => "request_decrease_all",
            Self::ApproveDecrease { .. } => "approve_decrease",
            Self::ForceDecrease { .. } => "force_decrease",
            Self::UnstakeNative { .. } => "unstake_native",
            Self::UnstakeLegacy { .. } => "unstake_legacy",
            Self::UnstakeAll { .. } => "unstake_all",
            Self::ApproveApplication { .. } => "approve_application",
            Self::SetPanicButton { .. } => "set_panic_button",
            Self::DisableApplication { .. } => "disable_application",
            Self::SetAuthorizationCeiling { .. } => "set_authorization_ceiling",
            Self::SetMinimumCommitment { .. } => "set_minimum_commitment",
            Self::TransferGovernance { .. } => "transfer_governance",
        }
    }
}

/// The outcome of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    /// Position in the scenario, from zero.
    pub index: usize,
    /// Action name.
    pub action: &'static str,
    /// Clock when the step ran.
    pub at: Tick,
    /// Error kind if the step failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    /// Error message if the step failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Whether the outcome matched `expect`.
    pub matched: bool,
}

/// The result of a full run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// Per-step outcomes.
    pub steps: Vec<StepOutcome>,
    /// Steps whose outcome did not match.
    pub mismatches: usize,
    /// Whether the event chain verified.
    pub chain_verified: bool,
    /// Every event emitted, setup included.
    pub events: Vec<EventRecord>,
    /// Final ledger state.
    pub ledger: LedgerSnapshot,
}

struct Runner {
    ledger: StakeLedger,
    legacy_a: InMemoryLegacySource,
    legacy_b: InMemoryLegacySource,
    endpoints: BTreeMap<ApplicationId, Arc<RecordingApplication>>,
    now: Tick,
}

impl Runner {
    fn new(config: LedgerConfig) -> Result<Self> {
        let legacy_a = InMemoryLegacySource::new();
        let legacy_b = InMemoryLegacySource::new();
        let ledger = StakeLedger::new(
            config,
            Arc::new(legacy_a.clone()),
            Arc::new(legacy_b.clone()),
        )
        .context("ledger configuration rejected")?;
        Ok(Self {
            ledger,
            legacy_a,
            legacy_b,
            endpoints: BTreeMap::new(),
            now: Tick::GENESIS,
        })
    }

    fn legacy(&self, kind: LegacyKind) -> &InMemoryLegacySource {
        match kind {
            LegacyKind::A => &self.legacy_a,
            LegacyKind::B => &self.legacy_b,
        }
    }

    fn set_legacy(&self, setup: &LegacySetup) {
        let operator = OperatorId::new(setup.operator.clone());
        self.legacy(setup.source).set_stake(
            operator.clone(),
            LegacyRecord {
                owner: setup.owner.clone(),
                beneficiary: setup
                    .beneficiary
                    .clone()
                    .unwrap_or_else(|| setup.owner.clone()),
                authorizer: setup
                    .authorizer
                    .clone()
                    .unwrap_or_else(|| setup.owner.clone()),
                amount: setup.amount,
            },
        );
        self.legacy(setup.source).set_eligible(
            operator,
            self.ledger.config().ledger_address.clone(),
            setup.eligible,
        );
    }

    fn endpoint(&mut self, application: &Address) -> Arc<RecordingApplication> {
        let id = ApplicationId::new(application.clone());
        Arc::clone(
            self.endpoints
                .entry(id.clone())
                .or_insert_with(|| Arc::new(RecordingApplication::new(id))),
        )
    }

    fn setup_application(&mut self, setup: &ApplicationSetup) -> Result<()> {
        let governance = TxContext::new(self.ledger.governance().clone(), self.now);
        let endpoint = self.endpoint(&setup.id);
        self.ledger
            .approve_application(&governance, endpoint)
            .with_context(|| format!("cannot approve application {}", setup.id))?;
        if let Some(panic) = &setup.panic_address {
            self.ledger
                .set_panic_button(&governance, &ApplicationId::new(setup.id.clone()), panic.clone())
                .with_context(|| format!("cannot set panic address for {}", setup.id))?;
        }
        Ok(())
    }

    /// Run one step. `Err` is a malformed step; ledger rejections are `Ok(Err)`.
    fn step(&mut self, step: &Step) -> Result<Result<(), LedgerError>> {
        let caller = || {
            step.caller
                .clone()
                .ok_or_else(|| anyhow!("step `{}` needs a caller", step.action.name()))
        };
        let op = |a: &Address| OperatorId::new(a.clone());
        let app = |a: &Address| ApplicationId::new(a.clone());

        let outcome = match &step.action {
            Action::Advance { ticks } => {
                self.now = self.now.saturating_add(*ticks);
                Ok(())
            }
            Action::SetLegacyStake(setup) => {
                self.set_legacy(setup);
                Ok(())
            }
            Action::SetApplicationRejection {
                application,
                reason,
            } => {
                let endpoint = self.endpoint(application);
                match reason {
                    Some(reason) => endpoint.reject(reason.clone()),
                    None => endpoint.accept(),
                }
                Ok(())
            }
            Action::Commit {
                operator,
                beneficiary,
                authorizer,
                amount,
            } => {
                let ctx = TxContext::new(caller()?, self.now);
                self.ledger.commit(
                    &ctx,
                    &op(operator),
                    beneficiary.clone(),
                    authorizer.clone(),
                    *amount,
                )
            }
            Action::SyncLegacy { source, operator } => {
                let ctx = TxContext::new(caller()?, self.now);
                self.ledger
                    .sync_legacy(&ctx, *source, &op(operator))
                    .map(|_| ())
            }
            Action::IncreaseAuthorization {
                operator,
                application,
                amount,
            } => {
                let ctx = TxContext::new(caller()?, self.now);
                self.ledger
                    .increase_authorization(&ctx, &op(operator), &app(application), *amount)
                    .map(|_| ())
            }
            Action::RequestDecrease {
                operator,
                application,
                amount,
            } => {
                let ctx = TxContext::new(caller()?, self.now);
                match amount {
                    Some(amount) => self.ledger.request_authorization_decrease(
                        &ctx,
                        &op(operator),
                        &app(application),
                        *amount,
                    ),
                    None => self.ledger.request_full_authorization_decrease(
                        &ctx,
                        &op(operator),
                        &app(application),
                    ),
                }
                .map(|_| ())
            }
            Action::RequestDecreaseAll { operator } => {
                let ctx = TxContext::new(caller()?, self.now);
                self.ledger
                    .request_decrease_all(&ctx, &op(operator))
                    .map(|_| ())
            }
            Action::ApproveDecrease { operator } => {
                let ctx = TxContext::new(caller()?, self.now);
                self.ledger
                    .approve_authorization_decrease(&ctx, &op(operator))
                    .map(|_| ())
            }
            Action::ForceDecrease {
                operator,
                application,
            } => {
                let ctx = TxContext::new(caller()?, self.now);
                self.ledger
                    .force_decrease_authorization(&ctx, &op(operator), &app(application))
                    .map(|_| ())
            }
            Action::UnstakeNative { operator, amount } => {
                let ctx = TxContext::new(caller()?, self.now);
                self.ledger.unstake_native(&ctx, &op(operator), *amount)
            }
            Action::UnstakeLegacy { source, operator } => {
                let ctx = TxContext::new(caller()?, self.now);
                self.ledger
                    .unstake_legacy(&ctx, *source, &op(operator))
                    .map(|_| ())
            }
            Action::UnstakeAll { operator } => {
                let ctx = TxContext::new(caller()?, self.now);
                self.ledger.unstake_all(&ctx, &op(operator))
            }
            Action::ApproveApplication { application } => {
                let ctx = TxContext::new(caller()?, self.now);
                let endpoint = self.endpoint(application);
                self.ledger.approve_application(&ctx, endpoint)
            }
            Action::SetPanicButton {
                application,
                panic_address,
            } => {
                let ctx = TxContext::new(caller()?, self.now);
                self.ledger
                    .set_panic_button(&ctx, &app(application), panic_address.clone())
            }
            Action::DisableApplication { application } => {
                let ctx = TxContext::new(caller()?, self.now);
                self.ledger.disable_application(&ctx, &app(application))
            }
            Action::SetAuthorizationCeiling { ceiling } => {
                let ctx = TxContext::new(caller()?, self.now);
                self.ledger.set_authorization_ceiling(&ctx, *ceiling)
            }
            Action::SetMinimumCommitment { amount } => {
                let ctx = TxContext::new(caller()?, self.now);
                self.ledger.set_minimum_commitment(&ctx, *amount)
            }
            Action::TransferGovernance { to } => {
                let ctx = TxContext::new(caller()?, self.now);
                self.ledger.transfer_governance(&ctx, to.clone())
            }
        };
        Ok(outcome)
    }
}

/// Replay a scenario against a fresh ledger built from `config`.
///
/// # Errors
///
/// Fails on malformed setup or a ledger step without a caller. Ledger
/// rejections are part of the report, not errors.
pub fn run_scenario(scenario: &Scenario, config: LedgerConfig) -> Result<ScenarioReport> {
    let mut runner = Runner::new(config)?;
    for setup in &scenario.legacy {
        runner.set_legacy(setup);
    }
    for setup in &scenario.applications {
        runner.setup_application(setup)?;
    }

    let mut steps = Vec::with_capacity(scenario.steps.len());
    for (index, step) in scenario.steps.iter().enumerate() {
        let at = runner.now;
        let result = runner
            .step(step)
            .with_context(|| format!("step {index} ({})", step.action.name()))?;
        let error = result.as_ref().err().map(LedgerError::kind);
        let matched = error == step.expect;
        if !matched {
            tracing::warn!(
                index,
                action = step.action.name(),
                expected = ?step.expect,
                actual = ?error,
                "step outcome mismatch"
            );
        }
        steps.push(StepOutcome {
            index,
            action: step.action.name(),
            at,
            error,
            message: result.err().map(|e| e.to_string()),
            matched,
        });
    }

    let mismatches = steps.iter().filter(|s| !s.matched).count();
    Ok(ScenarioReport {
        steps,
        mismatches,
        chain_verified: runner.ledger.events().verify().is_ok(),
        events: runner.ledger.events().records().to_vec(),
        ledger: runner.ledger.snapshot(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELEGATION: &str = r#"
config:
  ledger_address: "0x00000000000000000000000000000000000001ed"
  governance: "0x0000000000000000000000000000000000000090"
  authorization_ceiling: 1
  legacy_a: { ratio: "1450000000000000000", divisor: "1000000000000000" }
  legacy_b: { ratio: 1, divisor: 1 }
applications:
  - id: "0x0000000000000000000000000000000000000a01"
steps:
  - action: commit
    caller: "0x0000000000000000000000000000000000000011"
    operator: "0x0000000000000000000000000000000000000101"
    amount: "5"
  - action: increase_authorization
    caller: "0x0000000000000000000000000000000000000011"
    operator: "0x0000000000000000000000000000000000000101"
    application: "0x0000000000000000000000000000000000000a01"
    amount: "5"
  - action: unstake_native
    caller: "0x0000000000000000000000000000000000000011"
    operator: "0x0000000000000000000000000000000000000101"
    amount: "1"
    expect: unstake_exceeds_available
  - action: request_decrease
    caller: "0x0000000000000000000000000000000000000011"
    operator: "0x0000000000000000000000000000000000000101"
    application: "0x0000000000000000000000000000000000000a01"
  - action: approve_decrease
    caller: "0x0000000000000000000000000000000000000a01"
    operator: "0x0000000000000000000000000000000000000101"
  - action: advance
    ticks: 2
  - action: unstake_all
    caller: "0x0000000000000000000000000000000000000011"
    operator: "0x0000000000000000000000000000000000000101"
"#;

    fn parse(yaml: &str) -> Scenario {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn delegation_scenario_matches_expectations() {
        let scenario = parse(DELEGATION);
        let config = scenario.config.clone().unwrap();
        let report = run_scenario(&scenario, config).unwrap();
        assert_eq!(report.mismatches, 0, "{:#?}", report.steps);
        assert!(report.chain_verified);
        assert_eq!(report.steps[2].error, Some(ErrorKind::UnstakeExceedsAvailable));
        assert_eq!(report.steps[6].at, Tick::new(2));
        assert_eq!(report.ledger.native_custody, Amount::ZERO);
    }

    #[test]
    fn unexpected_failure_is_a_mismatch() {
        let yaml = DELEGATION.replace("    expect: unstake_exceeds_available\n", "");
        let scenario = parse(&yaml);
        let report = run_scenario(&scenario, scenario.config.clone().unwrap()).unwrap();
        assert_eq!(report.mismatches, 1);
        assert!(!report.steps[2].matched);
        assert!(report.steps[2].message.is_some());
    }

    #[test]
    fn missing_caller_is_an_error() {
        let yaml = DELEGATION.replacen(
            "    caller: \"0x0000000000000000000000000000000000000011\"\n    operator: \"0x0000000000000000000000000000000000000101\"\n    amount: \"5\"\n",
            "    operator: \"0x0000000000000000000000000000000000000101\"\n    amount: \"5\"\n",
            1,
        );
        let scenario = parse(&yaml);
        let err = run_scenario(&scenario, scenario.config.clone().unwrap()).unwrap_err();
        assert!(format!("{err:#}").contains("needs a caller"));
    }

    #[test]
    fn legacy_setup_and_rejection_toggle() {
        let yaml = r#"
applications:
  - id: "0x0000000000000000000000000000000000000a01"
legacy:
  - source: B
    operator: "0x0000000000000000000000000000000000000101"
    owner: "0x0000000000000000000000000000000000000011"
    amount: "100"
steps:
  - action: sync_legacy
    caller: "0x0000000000000000000000000000000000000077"
    source: B
    operator: "0x0000000000000000000000000000000000000101"
  - action: set_application_rejection
    application: "0x0000000000000000000000000000000000000a01"
    reason: "paused"
  - action: increase_authorization
    caller: "0x0000000000000000000000000000000000000011"
    operator: "0x0000000000000000000000000000000000000101"
    application: "0x0000000000000000000000000000000000000a01"
    amount: "10"
    expect: application_callback_failed
"#;
        let scenario = parse(yaml);
        assert!(scenario.config.is_none());
        let config = LedgerConfig::from_yaml_str(
            r#"
ledger_address: "0x00000000000000000000000000000000000001ed"
governance: "0x0000000000000000000000000000000000000090"
authorization_ceiling: 1
legacy_a: { ratio: 1, divisor: 1 }
legacy_b: { ratio: 1, divisor: 1 }
"#,
        )
        .unwrap();
        let report = run_scenario(&scenario, config).unwrap();
        assert_eq!(report.mismatches, 0, "{:#?}", report.steps);
        assert_eq!(report.ledger.participants.len(), 1);
    }
}
