//! Slack-bounded withdrawals.

use tracing::info;

use unistake_core::{Amount, OperatorId};

use super::{rejected, require_owner_or_operator, StakeLedger, TxContext};
use crate::error::LedgerError;
use crate::events::LedgerEvent;
use crate::invariant;
use crate::legacy::LegacyKind;
use crate::stake::{LegacyBalance, StakeRecord, StakeSource};

impl StakeLedger {
    /// Return `amount` of native stake to the owner.
    ///
    /// The owner or the operator may call this. The amount is bounded by
    /// the native withdrawable amount. With a nonzero minimum commitment,
    /// dropping below it requires the holding period to have passed.
    pub fn unstake_native(
        &mut self,
        ctx: &TxContext,
        operator: &OperatorId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.try_unstake_native(ctx, operator, amount)
            .map_err(rejected("unstake_native"))
    }

    fn try_unstake_native(
        &mut self,
        ctx: &TxContext,
        operator: &OperatorId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::ZeroAmount {
                operation: "unstake_native",
            });
        }
        let participant = self.staked(operator)?;
        require_owner_or_operator(ctx, operator, &participant.stake)?;

        let balance = participant.stake.native;
        let available =
            invariant::withdrawable(balance, participant.stake.total(), participant.authorized_amounts());
        if amount > available {
            return Err(LedgerError::UnstakeExceedsAvailable {
                operator: operator.clone(),
                stake_source: StakeSource::Native,
                requested: amount,
                available,
            });
        }
        let remaining = balance.checked_sub(amount)?;
        let minimum = self.config.minimum_commitment;
        if !minimum.is_zero() && remaining < minimum {
            self.check_holding_period(ctx, operator, &participant.stake)?;
        }
        let custody = self.native_custody.checked_sub(amount)?;
        let recipient = participant.stake.roles.owner.clone();

        let record = self.prepare(
            ctx.at,
            LedgerEvent::Unstaked {
                operator: operator.clone(),
                source: StakeSource::Native,
                amount,
                recipient: Some(recipient.clone()),
            },
        )?;

        if let Some(p) = self.participants.get_mut(operator) {
            p.stake.native = remaining;
        }
        self.native_custody = custody;
        self.append([record])?;
        info!(%operator, %amount, %remaining, %recipient, "native stake withdrawn");
        Ok(())
    }

    /// Release the whole cached balance of one legacy system.
    ///
    /// Succeeds only when no part of it is locked by an authorization.
    /// The legacy system keeps custody of the underlying tokens.
    pub fn unstake_legacy(
        &mut self,
        ctx: &TxContext,
        kind: LegacyKind,
        operator: &OperatorId,
    ) -> Result<Amount, LedgerError> {
        self.try_unstake_legacy(ctx, kind, operator)
            .map_err(rejected("unstake_legacy"))
    }

    fn try_unstake_legacy(
        &mut self,
        ctx: &TxContext,
        kind: LegacyKind,
        operator: &OperatorId,
    ) -> Result<Amount, LedgerError> {
        let participant = self.staked(operator)?;
        require_owner_or_operator(ctx, operator, &participant.stake)?;

        let source = StakeSource::from(kind);
        let cached = *participant.stake.legacy(kind);
        if cached == LegacyBalance::default() {
            return Err(LedgerError::ZeroAmount {
                operation: "unstake_legacy",
            });
        }
        let locked = invariant::min_locked(
            cached.converted,
            participant.stake.total(),
            participant.authorized_amounts(),
        );
        if !locked.is_zero() {
            return Err(LedgerError::UnstakeExceedsAvailable {
                operator: operator.clone(),
                stake_source: source,
                requested: cached.converted,
                available: cached.converted.saturating_sub(locked),
            });
        }

        let record = self.prepare(
            ctx.at,
            LedgerEvent::Unstaked {
                operator: operator.clone(),
                source,
                amount: cached.converted,
                recipient: None,
            },
        )?;

        if let Some(p) = self.participants.get_mut(operator) {
            *p.stake.legacy_mut(kind) = LegacyBalance::default();
        }
        self.append([record])?;
        info!(%operator, %source, amount = %cached.converted, "legacy mirror released");
        Ok(cached.converted)
    }

    /// Release every balance at once and return the native part to the owner.
    ///
    /// Requires every authorization to be zero. With a nonzero minimum
    /// commitment the holding period must have passed.
    pub fn unstake_all(&mut self, ctx: &TxContext, operator: &OperatorId) -> Result<(), LedgerError> {
        self.try_unstake_all(ctx, operator)
            .map_err(rejected("unstake_all"))
    }

    fn try_unstake_all(&mut self, ctx: &TxContext, operator: &OperatorId) -> Result<(), LedgerError> {
        let participant = self.staked(operator)?;
        require_owner_or_operator(ctx, operator, &participant.stake)?;

        if let Some((application, entry)) = participant
            .authorizations
            .iter()
            .find(|(_, e)| !e.authorized().is_zero())
        {
            return Err(LedgerError::StakeStillAuthorized {
                operator: operator.clone(),
                application: application.clone(),
                authorized: entry.authorized(),
            });
        }
        let stake = &participant.stake;
        if stake.is_empty() {
            return Err(LedgerError::ZeroAmount {
                operation: "unstake_all",
            });
        }
        if !self.config.minimum_commitment.is_zero() {
            self.check_holding_period(ctx, operator, stake)?;
        }
        let custody = self.native_custody.checked_sub(stake.native)?;
        let native = stake.native;
        let legacy_a = stake.legacy_a.converted;
        let legacy_b = stake.legacy_b.converted;
        let recipient = stake.roles.owner.clone();

        let record = self.prepare(
            ctx.at,
            LedgerEvent::UnstakedAll {
                operator: operator.clone(),
                native,
                legacy_a,
                legacy_b,
                recipient: recipient.clone(),
            },
        )?;

        if let Some(p) = self.participants.get_mut(operator) {
            p.stake.native = Amount::ZERO;
            p.stake.legacy_a = LegacyBalance::default();
            p.stake.legacy_b = LegacyBalance::default();
        }
        self.native_custody = custody;
        self.append([record])?;
        info!(%operator, %native, %legacy_a, %legacy_b, %recipient, "all stake released");
        Ok(())
    }

    fn check_holding_period(
        &self,
        ctx: &TxContext,
        operator: &OperatorId,
        stake: &StakeRecord,
    ) -> Result<(), LedgerError> {
        let required = self.config.minimum_holding_period;
        if ctx.at.since(stake.committed_at) < required {
            return Err(LedgerError::MinimumHoldingPeriodNotElapsed {
                operator: operator.clone(),
                committed_at: stake.committed_at,
                now: ctx.at,
                required,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixture::*;
    use crate::error::{ErrorKind, LedgerError};
    use crate::legacy::LegacyKind;
    use crate::stake::StakeSource;
    use unistake_core::Amount;

    #[test]
    fn partial_unstake_above_minimum_needs_no_holding_period() {
        let mut f = Fixture::new();
        f.stake(&op(1), 100_000, 1);
        f.ledger
            .unstake_native(&f.owner_at(2), &op(1), amt(60_000))
            .unwrap();
        assert_eq!(f.ledger.balance(&op(1), StakeSource::Native), amt(40_000));
        assert_eq!(f.ledger.native_custody(), amt(40_000));
    }

    #[test]
    fn dropping_below_minimum_waits_for_holding_period() {
        let mut f = Fixture::new();
        f.stake(&op(1), 100_000, 1);
        let err = f
            .ledger
            .unstake_native(&f.owner_at(24), &op(1), amt(60_001))
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::MinimumHoldingPeriodNotElapsed { required: 24, .. }
        ));
        f.ledger
            .unstake_native(&f.owner_at(25), &op(1), amt(60_001))
            .unwrap();
    }

    #[test]
    fn operator_may_unstake_others_may_not() {
        let mut f = Fixture::new();
        f.stake(&op(1), 100_000, 1);
        f.ledger
            .unstake_native(&f.ctx(op(1).address().clone(), 2), &op(1), amt(1))
            .unwrap();
        let err = f
            .ledger
            .unstake_native(&f.authorizer_at(2), &op(1), amt(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAuthorizedRole);
    }

    #[test]
    fn authorization_locks_native() {
        let mut f = Fixture::new();
        f.stake(&op(1), 100_000, 1);
        f.approve(1);
        f.authorize(&op(1), 1, 90_000);
        assert_eq!(f.ledger.withdrawable(&op(1), StakeSource::Native), amt(10_000));
        let err = f
            .ledger
            .unstake_native(&f.owner_at(30), &op(1), amt(10_001))
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::UnstakeExceedsAvailable { available, .. } if available == amt(10_000)
        ));
    }

    #[test]
    fn zero_unstake_rejected() {
        let mut f = Fixture::new();
        f.stake(&op(1), 100_000, 1);
        assert_eq!(
            f.ledger
                .unstake_native(&f.owner_at(2), &op(1), Amount::ZERO)
                .unwrap_err()
                .kind(),
            ErrorKind::ZeroAmount
        );
    }

    #[test]
    fn legacy_release_requires_no_lock() {
        let mut f = Fixture::new();
        f.stake(&op(1), 50_000, 1);
        f.legacy_b.set_stake(op(1), legacy_record(owner(), 50_000));
        f.ledger
            .sync_legacy(&f.owner_at(1), LegacyKind::B, &op(1))
            .unwrap();
        f.approve(1);
        f.authorize(&op(1), 1, 60_000);
        // slack 40_000 < legacy balance 50_000
        assert_eq!(f.ledger.min_locked(&op(1), StakeSource::LegacyB), amt(10_000));
        assert_eq!(
            f.ledger
                .unstake_legacy(&f.owner_at(2), LegacyKind::B, &op(1))
                .unwrap_err()
                .kind(),
            ErrorKind::UnstakeExceedsAvailable
        );

        f.ledger
            .request_authorization_decrease(&f.authorizer_at(3), &op(1), &app(1), amt(10_000))
            .unwrap();
        f.ledger
            .approve_authorization_decrease(&f.ctx(app(1).address().clone(), 4), &op(1))
            .unwrap();
        let released = f
            .ledger
            .unstake_legacy(&f.owner_at(5), LegacyKind::B, &op(1))
            .unwrap();
        assert_eq!(released, amt(50_000));
        assert_eq!(f.ledger.total_stake(&op(1)), amt(50_000));
        assert_eq!(f.ledger.native_custody(), amt(50_000));
    }

    #[test]
    fn unstake_all_requires_zero_authorizations() {
        let mut f = Fixture::new();
        f.stake(&op(1), 100_000, 1);
        f.approve(1);
        f.authorize(&op(1), 1, 1);
        let err = f.ledger.unstake_all(&f.owner_at(40), &op(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StakeStillAuthorized);

        f.ledger
            .request_full_authorization_decrease(&f.authorizer_at(41), &op(1), &app(1))
            .unwrap();
        f.ledger
            .approve_authorization_decrease(&f.ctx(app(1).address().clone(), 42), &op(1))
            .unwrap();
        f.ledger.unstake_all(&f.owner_at(43), &op(1)).unwrap();
        assert_eq!(f.ledger.total_stake(&op(1)), Amount::ZERO);
        assert_eq!(f.ledger.native_custody(), Amount::ZERO);
    }

    #[test]
    fn unstake_all_respects_holding_period() {
        let mut f = Fixture::new();
        f.stake(&op(1), 100_000, 10);
        let err = f.ledger.unstake_all(&f.owner_at(33), &op(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MinimumHoldingPeriodNotElapsed);
        f.ledger.unstake_all(&f.owner_at(34), &op(1)).unwrap();
    }

    #[test]
    fn no_minimum_means_no_holding_period() {
        let mut config = config();
        config.minimum_commitment = Amount::ZERO;
        let mut f = Fixture::with_config(config);
        f.stake(&op(1), 5, 10);
        f.ledger.unstake_all(&f.owner_at(10), &op(1)).unwrap();
    }
}
