//! Native commitments and legacy balance synchronization.

use tracing::{debug, info};

use unistake_core::{Address, Amount, Conversion, OperatorId};

use super::{rejected, require_nonzero, Participant, StakeLedger, TxContext};
use crate::error::{InvalidOperatorReason, LedgerError, Role};
use crate::events::LedgerEvent;
use crate::legacy::{LegacyKind, LegacyRecord};
use crate::stake::{LegacyBalance, Roles, StakeRecord};

impl StakeLedger {
    /// Commit native tokens for `operator`, taking them into custody.
    ///
    /// A commitment to an operator with no balance at all assigns roles:
    /// the caller becomes owner, and `beneficiary` and `authorizer` default
    /// to the caller. A commitment while the native balance is zero is
    /// *fresh* even if legacy stake remains: the amount must meet the
    /// minimum commitment and the holding-period clock restarts. Any other
    /// commitment is a top-up and keeps the clock.
    pub fn commit(
        &mut self,
        ctx: &TxContext,
        operator: &OperatorId,
        beneficiary: Option<Address>,
        authorizer: Option<Address>,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.try_commit(ctx, operator, beneficiary, authorizer, amount)
            .map_err(rejected("commit"))
    }

    fn try_commit(
        &mut self,
        ctx: &TxContext,
        operator: &OperatorId,
        beneficiary: Option<Address>,
        authorizer: Option<Address>,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let invalid = |reason| LedgerError::InvalidOperator {
            operator: operator.clone(),
            reason,
        };
        if operator.address().is_zero() {
            return Err(invalid(InvalidOperatorReason::ZeroAddress));
        }
        if amount.is_zero() {
            return Err(invalid(InvalidOperatorReason::ZeroAmount));
        }

        let existing = self.participants.get(operator);
        if let Some(p) = existing.filter(|p| p.is_in_use()) {
            if p.stake.roles.owner != ctx.caller {
                return Err(invalid(InvalidOperatorReason::ClaimedByOtherOwner {
                    owner: p.stake.roles.owner.clone(),
                }));
            }
        }
        for kind in LegacyKind::ALL {
            if let Some(record) = self.legacy_source(kind).stake_of(operator) {
                if !record.amount.is_zero() && record.owner != ctx.caller {
                    return Err(invalid(InvalidOperatorReason::ClaimedInLegacy {
                        source: kind,
                        owner: record.owner,
                    }));
                }
            }
        }

        let unused = existing.map_or(true, |p| p.stake.total().is_zero());
        let fresh = existing.map_or(true, |p| p.stake.native.is_zero());
        if fresh {
            let minimum = self.config.minimum_commitment;
            if !minimum.is_zero() && amount < minimum {
                return Err(invalid(InvalidOperatorReason::BelowMinimum { amount, minimum }));
            }
        }
        let mut stake = if unused {
            let roles = Roles {
                owner: ctx.caller.clone(),
                beneficiary: beneficiary.unwrap_or_else(|| ctx.caller.clone()),
                authorizer: authorizer.unwrap_or_else(|| ctx.caller.clone()),
            };
            require_nonzero(&roles.owner, Role::Owner)?;
            require_nonzero(&roles.beneficiary, Role::Beneficiary)?;
            require_nonzero(&roles.authorizer, Role::Authorizer)?;
            let mut stake = existing
                .map(|p| p.stake.clone())
                .unwrap_or_else(|| StakeRecord::new(roles.clone(), ctx.at));
            stake.roles = roles;
            stake
        } else {
            if beneficiary.is_some() || authorizer.is_some() {
                debug!(%operator, "top-up keeps existing roles; supplied roles ignored");
            }
            existing
                .map(|p| p.stake.clone())
                .ok_or_else(|| invalid(InvalidOperatorReason::NotStaked))?
        };
        if fresh {
            stake.committed_at = ctx.at;
        }

        stake.native = stake.native.checked_add(amount)?;
        stake.checked_total()?;
        let custody = self.native_custody.checked_add(amount)?;

        let record = self.prepare(
            ctx.at,
            LedgerEvent::StakeCommitted {
                operator: operator.clone(),
                owner: stake.roles.owner.clone(),
                beneficiary: stake.roles.beneficiary.clone(),
                authorizer: stake.roles.authorizer.clone(),
                amount,
                fresh,
            },
        )?;

        let native = stake.native;
        self.put_stake(operator, stake);
        self.native_custody = custody;
        self.append([record])?;
        info!(%operator, %amount, %native, fresh, "stake committed");
        Ok(())
    }

    /// Mirror an operator's balance from a legacy system.
    ///
    /// Anyone may call this. The observed raw amount must exceed the cached
    /// one; the cache is then overwritten with the raw amount and its
    /// conversion. An operator first seen here takes its roles from the
    /// legacy record and starts its holding-period clock now.
    pub fn sync_legacy(
        &mut self,
        ctx: &TxContext,
        kind: LegacyKind,
        operator: &OperatorId,
    ) -> Result<Conversion, LedgerError> {
        self.try_sync_legacy(ctx, kind, operator)
            .map_err(rejected("sync_legacy"))
    }

    fn try_sync_legacy(
        &mut self,
        ctx: &TxContext,
        kind: LegacyKind,
        operator: &OperatorId,
    ) -> Result<Conversion, LedgerError> {
        let source = self.legacy_source(kind);
        let existing = self.participants.get(operator);
        let cached = existing
            .map(|p| p.stake.legacy(kind).raw)
            .unwrap_or(Amount::ZERO);

        let observed = source
            .stake_of(operator)
            .ok_or_else(|| LedgerError::NothingToSync {
                operator: operator.clone(),
                legacy: kind,
                cached,
                observed: None,
            })?;
        if kind.requires_eligibility() && !source.is_eligible(operator, &self.config.ledger_address) {
            return Err(LedgerError::LegacyNotEligible {
                operator: operator.clone(),
                legacy: kind,
            });
        }
        if observed.amount <= cached {
            return Err(LedgerError::NothingToSync {
                operator: operator.clone(),
                legacy: kind,
                cached,
                observed: Some(observed.amount),
            });
        }

        let mut stake = match existing {
            Some(p) if p.is_in_use() => {
                if p.stake.roles.owner != observed.owner {
                    return Err(LedgerError::InvalidOperator {
                        operator: operator.clone(),
                        reason: InvalidOperatorReason::ClaimedByOtherOwner {
                            owner: p.stake.roles.owner.clone(),
                        },
                    });
                }
                p.stake.clone()
            }
            Some(p) => {
                let mut stake = p.stake.clone();
                stake.roles = roles_from(&observed)?;
                stake.committed_at = ctx.at;
                stake
            }
            None => StakeRecord::new(roles_from(&observed)?, ctx.at),
        };

        let conversion = self.conversion_ratio(kind).convert(observed.amount)?;
        *stake.legacy_mut(kind) = LegacyBalance {
            raw: observed.amount,
            converted: conversion.converted,
        };
        stake.checked_total()?;

        let record = self.prepare(
            ctx.at,
            LedgerEvent::LegacySynced {
                operator: operator.clone(),
                source: kind,
                raw: observed.amount,
                converted: conversion.converted,
                remainder: conversion.remainder,
            },
        )?;

        self.put_stake(operator, stake);
        self.append([record])?;
        info!(
            %operator,
            source = %kind,
            raw = %observed.amount,
            converted = %conversion.converted,
            remainder = %conversion.remainder,
            "legacy balance synced"
        );
        Ok(conversion)
    }

    fn put_stake(&mut self, operator: &OperatorId, stake: StakeRecord) {
        match self.participants.get_mut(operator) {
            Some(p) => p.stake = stake,
            None => {
                self.participants
                    .insert(operator.clone(), Participant::new(stake));
            }
        }
    }
}

fn roles_from(record: &LegacyRecord) -> Result<Roles, LedgerError> {
    require_nonzero(&record.owner, Role::Owner)?;
    require_nonzero(&record.beneficiary, Role::Beneficiary)?;
    require_nonzero(&record.authorizer, Role::Authorizer)?;
    Ok(Roles {
        owner: record.owner.clone(),
        beneficiary: record.beneficiary.clone(),
        authorizer: record.authorizer.clone(),
    })
}
