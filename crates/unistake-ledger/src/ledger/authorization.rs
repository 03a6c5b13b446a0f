//! Authorization increases and the two-phase decrease.

use tracing::info;

use unistake_core::{Amount, ApplicationId, OperatorId};
use unistake_state::{AuthorizationChange, AuthorizationEntry, DecreaseRequest};

use super::{callback_failed, rejected, require_role, state_error, StakeLedger, TxContext};
use crate::error::{LedgerError, Role};
use crate::events::LedgerEvent;
use crate::invariant;

impl StakeLedger {
    /// Grow an operator's authorization for an application.
    ///
    /// Only the authorizer may call this. The application must be approved
    /// and enabled, a first authorization counts against the ceiling, and
    /// the sum of authorizations may not exceed total stake afterwards.
    /// The application is notified before the change is applied.
    pub fn increase_authorization(
        &mut self,
        ctx: &TxContext,
        operator: &OperatorId,
        application: &ApplicationId,
        amount: Amount,
    ) -> Result<AuthorizationChange, LedgerError> {
        self.try_increase_authorization(ctx, operator, application, amount)
            .map_err(rejected("increase_authorization"))
    }

    fn try_increase_authorization(
        &mut self,
        ctx: &TxContext,
        operator: &OperatorId,
        application: &ApplicationId,
        amount: Amount,
    ) -> Result<AuthorizationChange, LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::ZeroAmount {
                operation: "increase_authorization",
            });
        }
        let participant = self.staked(operator)?;
        require_role(&ctx.caller, &participant.stake.roles.authorizer, Role::Authorizer)?;
        self.enabled_application(application)?;

        let mut entry = participant
            .authorizations
            .get(application)
            .copied()
            .unwrap_or_default();
        if entry.authorized().is_zero() {
            let authorized = participant.active_applications();
            let ceiling = self.config.authorization_ceiling;
            if authorized >= ceiling as usize {
                return Err(LedgerError::CeilingExceeded {
                    operator: operator.clone(),
                    authorized,
                    ceiling,
                });
            }
        }
        let available =
            invariant::available_to_authorize(participant.stake.total(), participant.authorized_amounts());
        if amount > available {
            return Err(LedgerError::InsufficientStakeToAuthorize {
                operator: operator.clone(),
                requested: amount,
                available,
            });
        }

        let change = entry
            .increase(amount)
            .map_err(state_error("increase_authorization", operator, application))?;
        let record = self.prepare(
            ctx.at,
            LedgerEvent::AuthorizationIncreased {
                operator: operator.clone(),
                application: application.clone(),
                from: change.from,
                to: change.to,
            },
        )?;
        self.endpoint(application)?
            .authorization_increased(operator, change.from, change.to)
            .map_err(callback_failed(application))?;

        self.put_authorization(operator, application, entry);
        self.append([record])?;
        info!(%operator, %application, from = %change.from, to = %change.to, "authorization increased");
        Ok(change)
    }

    /// Request that an operator's authorization for an application shrink
    /// by `amount`.
    ///
    /// Only the authorizer may call this. A new request replaces any
    /// pending one. The authorized amount does not change until the
    /// application calls [`approve_authorization_decrease`](Self::approve_authorization_decrease).
    pub fn request_authorization_decrease(
        &mut self,
        ctx: &TxContext,
        operator: &OperatorId,
        application: &ApplicationId,
        amount: Amount,
    ) -> Result<DecreaseRequest, LedgerError> {
        self.try_request_decrease(ctx, operator, application, Some(amount))
            .map_err(rejected("request_authorization_decrease"))
    }

    /// Request that an operator's whole authorization for an application
    /// be released.
    pub fn request_full_authorization_decrease(
        &mut self,
        ctx: &TxContext,
        operator: &OperatorId,
        application: &ApplicationId,
    ) -> Result<DecreaseRequest, LedgerError> {
        self.try_request_decrease(ctx, operator, application, None)
            .map_err(rejected("request_full_authorization_decrease"))
    }

    fn try_request_decrease(
        &mut self,
        ctx: &TxContext,
        operator: &OperatorId,
        application: &ApplicationId,
        amount: Option<Amount>,
    ) -> Result<DecreaseRequest, LedgerError> {
        let participant = self.staked(operator)?;
        require_role(&ctx.caller, &participant.stake.roles.authorizer, Role::Authorizer)?;
        self.enabled_application(application)?;

        let mut entry = participant
            .authorizations
            .get(application)
            .copied()
            .unwrap_or_default();
        let amount = amount.unwrap_or_else(|| entry.authorized());
        let request = entry
            .request_decrease(amount)
            .map_err(state_error("request_authorization_decrease", operator, application))?;
        let record = self.prepare(
            ctx.at,
            LedgerEvent::AuthorizationDecreaseRequested {
                operator: operator.clone(),
                application: application.clone(),
                from: request.from,
                to: request.to,
            },
        )?;
        self.endpoint(application)?
            .authorization_decrease_requested(operator, request.from, request.to)
            .map_err(callback_failed(application))?;

        self.put_authorization(operator, application, entry);
        self.append([record])?;
        info!(
            %operator,
            %application,
            from = %request.from,
            to = %request.to,
            superseded = %request.superseded,
            "authorization decrease requested"
        );
        Ok(request)
    }

    /// Request full release from every application the operator authorizes.
    ///
    /// Fails as a whole if any of them is disabled; those are cleared with
    /// [`force_decrease_authorization`](Self::force_decrease_authorization)
    /// instead. Applications are notified in id order and the first
    /// rejection aborts the batch.
    pub fn request_decrease_all(
        &mut self,
        ctx: &TxContext,
        operator: &OperatorId,
    ) -> Result<Vec<(ApplicationId, DecreaseRequest)>, LedgerError> {
        self.try_request_decrease_all(ctx, operator)
            .map_err(rejected("request_decrease_all"))
    }

    fn try_request_decrease_all(
        &mut self,
        ctx: &TxContext,
        operator: &OperatorId,
    ) -> Result<Vec<(ApplicationId, DecreaseRequest)>, LedgerError> {
        let participant = self.staked(operator)?;
        require_role(&ctx.caller, &participant.stake.roles.authorizer, Role::Authorizer)?;

        let mut updates = Vec::new();
        for (application, entry) in &participant.authorizations {
            if entry.authorized().is_zero() {
                continue;
            }
            self.enabled_application(application)?;
            let mut entry = *entry;
            let request = entry
                .request_decrease(entry.authorized())
                .map_err(state_error("request_decrease_all", operator, application))?;
            updates.push((application.clone(), entry, request));
        }
        if updates.is_empty() {
            return Err(LedgerError::ZeroAmount {
                operation: "request_decrease_all",
            });
        }

        let events = updates
            .iter()
            .map(|(application, _, request)| LedgerEvent::AuthorizationDecreaseRequested {
                operator: operator.clone(),
                application: application.clone(),
                from: request.from,
                to: request.to,
            })
            .collect();
        let records = self.events.prepare_batch(ctx.at, events)?;
        for (application, _, request) in &updates {
            self.endpoint(application)?
                .authorization_decrease_requested(operator, request.from, request.to)
                .map_err(callback_failed(application))?;
        }

        let mut out = Vec::with_capacity(updates.len());
        for (application, entry, request) in updates {
            self.put_authorization(operator, &application, entry);
            out.push((application, request));
        }
        self.append(records)?;
        info!(%operator, applications = out.len(), "full decrease requested everywhere");
        Ok(out)
    }

    /// Approve the pending decrease for `operator`. The caller is the
    /// application itself and must be approved and enabled.
    pub fn approve_authorization_decrease(
        &mut self,
        ctx: &TxContext,
        operator: &OperatorId,
    ) -> Result<AuthorizationChange, LedgerError> {
        self.try_approve_decrease(ctx, operator)
            .map_err(rejected("approve_authorization_decrease"))
    }

    fn try_approve_decrease(
        &mut self,
        ctx: &TxContext,
        operator: &OperatorId,
    ) -> Result<AuthorizationChange, LedgerError> {
        let application = ApplicationId::new(ctx.caller.clone());
        self.enabled_application(&application)?;
        let participant = self.staked(operator)?;
        let mut entry = participant
            .authorizations
            .get(&application)
            .copied()
            .unwrap_or_default();
        let change = entry
            .approve_decrease()
            .map_err(state_error("approve_authorization_decrease", operator, &application))?;
        let record = self.prepare(
            ctx.at,
            LedgerEvent::AuthorizationDecreaseApproved {
                operator: operator.clone(),
                application: application.clone(),
                from: change.from,
                to: change.to,
            },
        )?;

        self.put_authorization(operator, &application, entry);
        self.append([record])?;
        info!(%operator, %application, from = %change.from, to = %change.to, "authorization decrease approved");
        Ok(change)
    }

    /// Drop an operator's authorization at a disabled application.
    ///
    /// Anyone may call this. The application is not notified.
    pub fn force_decrease_authorization(
        &mut self,
        ctx: &TxContext,
        operator: &OperatorId,
        application: &ApplicationId,
    ) -> Result<AuthorizationChange, LedgerError> {
        self.try_force_decrease(ctx, operator, application)
            .map_err(rejected("force_decrease_authorization"))
    }

    fn try_force_decrease(
        &mut self,
        ctx: &TxContext,
        operator: &OperatorId,
        application: &ApplicationId,
    ) -> Result<AuthorizationChange, LedgerError> {
        match self.applications.get(application) {
            Some(record) if record.status.is_disabled() => {}
            Some(record) if record.status.is_approved() => {
                return Err(LedgerError::ApplicationNotDisabled {
                    application: application.clone(),
                })
            }
            _ => {
                return Err(LedgerError::ApplicationNotApproved {
                    application: application.clone(),
                })
            }
        }
        let participant = self.staked(operator)?;
        let mut entry = participant
            .authorizations
            .get(application)
            .copied()
            .unwrap_or_default();
        if entry.is_empty() {
            return Err(LedgerError::ZeroAmount {
                operation: "force_decrease_authorization",
            });
        }
        let change = entry.clear();
        let record = self.prepare(
            ctx.at,
            LedgerEvent::AuthorizationForceDecreased {
                operator: operator.clone(),
                application: application.clone(),
                from: change.from,
                to: change.to,
            },
        )?;

        self.put_authorization(operator, application, entry);
        self.append([record])?;
        info!(%operator, %application, released = %change.from, "authorization force-decreased");
        Ok(change)
    }

    fn put_authorization(
        &mut self,
        operator: &OperatorId,
        application: &ApplicationId,
        entry: AuthorizationEntry,
    ) {
        if let Some(p) = self.participants.get_mut(operator) {
            p.authorizations.insert(application.clone(), entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixture::*;
    use crate::application::Notification;
    use crate::error::{ErrorKind, LedgerError};
    use unistake_core::Amount;
    use unistake_state::DecreaseState;

    #[test]
    fn increase_notifies_and_applies() {
        let mut f = Fixture::new();
        f.stake(&op(1), 100_000, 1);
        let endpoint = f.approve(1);
        f.authorize(&op(1), 1, 60_000);
        assert_eq!(f.ledger.authorized(&op(1), &app(1)), amt(60_000));
        assert_eq!(f.ledger.available_to_authorize(&op(1)), amt(40_000));
        assert_eq!(
            endpoint.received(),
            vec![Notification::Increased {
                operator: op(1),
                from: Amount::ZERO,
                to: amt(60_000)
            }]
        );
    }

    #[test]
    fn only_authorizer_may_increase() {
        let mut f = Fixture::new();
        f.stake(&op(1), 100_000, 1);
        f.approve(1);
        let err = f
            .ledger
            .increase_authorization(&f.owner_at(2), &op(1), &app(1), amt(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAuthorizedRole);
    }

    #[test]
    fn sum_of_authorizations_bounded_by_total() {
        let mut f = Fixture::new();
        f.stake(&op(1), 100_000, 1);
        f.approve(1);
        f.approve(2);
        f.authorize(&op(1), 1, 70_000);
        let err = f
            .ledger
            .increase_authorization(&f.authorizer_at(2), &op(1), &app(2), amt(30_001))
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientStakeToAuthorize { available, .. } if available == amt(30_000)
        ));
        f.authorize(&op(1), 2, 30_000);
    }

    #[test]
    fn ceiling_counts_distinct_applications() {
        let mut f = Fixture::new();
        f.stake(&op(1), 100_000, 1);
        for n in 1..=3 {
            f.approve(n);
        }
        f.authorize(&op(1), 1, 10);
        f.authorize(&op(1), 2, 10);
        // topping up an existing one is fine at the ceiling
        f.authorize(&op(1), 1, 10);
        let err = f
            .ledger
            .increase_authorization(&f.authorizer_at(2), &op(1), &app(3), amt(10))
            .unwrap_err();
        assert!(matches!(err, LedgerError::CeilingExceeded { authorized: 2, ceiling: 2, .. }));
    }

    #[test]
    fn zero_ceiling_blocks_all() {
        let mut config = config();
        config.authorization_ceiling = 0;
        let mut f = Fixture::with_config(config);
        f.stake(&op(1), 100_000, 1);
        f.approve(1);
        let err = f
            .ledger
            .increase_authorization(&f.authorizer_at(2), &op(1), &app(1), amt(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CeilingExceeded);
    }

    #[test]
    fn callback_rejection_leaves_state_untouched() {
        let mut f = Fixture::new();
        f.stake(&op(1), 100_000, 1);
        let endpoint = f.approve(1);
        endpoint.reject("not now");
        let events_before = f.ledger.events().len();
        let err = f
            .ledger
            .increase_authorization(&f.authorizer_at(2), &op(1), &app(1), amt(5))
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::ApplicationCallbackFailed { ref reason, .. } if reason == "not now"
        ));
        assert_eq!(f.ledger.authorized(&op(1), &app(1)), Amount::ZERO);
        assert_eq!(f.ledger.events().len(), events_before);
    }

    #[test]
    fn decrease_takes_effect_on_approval() {
        let mut f = Fixture::new();
        f.stake(&op(1), 100_000, 1);
        f.approve(1);
        f.authorize(&op(1), 1, 50_000);
        let request = f
            .ledger
            .request_authorization_decrease(&f.authorizer_at(2), &op(1), &app(1), amt(20_000))
            .unwrap();
        assert_eq!(request.to, amt(30_000));
        assert_eq!(f.ledger.authorized(&op(1), &app(1)), amt(50_000));
        assert_eq!(
            f.ledger.authorization(&op(1), &app(1)).state(),
            DecreaseState::DecreasePending
        );

        let change = f
            .ledger
            .approve_authorization_decrease(&f.ctx(app(1).address().clone(), 3), &op(1))
            .unwrap();
        assert_eq!(change.to, amt(30_000));
        assert_eq!(f.ledger.pending_decrease(&op(1), &app(1)), Amount::ZERO);
    }

    #[test]
    fn approval_without_request_fails() {
        let mut f = Fixture::new();
        f.stake(&op(1), 100_000, 1);
        f.approve(1);
        f.authorize(&op(1), 1, 50_000);
        let err = f
            .ledger
            .approve_authorization_decrease(&f.ctx(app(1).address().clone(), 3), &op(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoDecreaseInProgress);
    }

    #[test]
    fn disabled_application_cannot_approve() {
        let mut f = Fixture::new();
        f.stake(&op(1), 100_000, 1);
        f.approve(1);
        f.authorize(&op(1), 1, 50_000);
        f.ledger
            .request_authorization_decrease(&f.authorizer_at(2), &op(1), &app(1), amt(20_000))
            .unwrap();
        f.ledger
            .disable_application(&f.ctx(panic_address(), 3), &app(1))
            .unwrap();
        let events_before = f.ledger.events().len();

        let err = f
            .ledger
            .approve_authorization_decrease(&f.ctx(app(1).address().clone(), 4), &op(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ApplicationDisabled);
        assert_eq!(f.ledger.pending_decrease(&op(1), &app(1)), amt(20_000));
        assert_eq!(f.ledger.authorized(&op(1), &app(1)), amt(50_000));
        assert_eq!(f.ledger.events().len(), events_before);
    }

    #[test]
    fn second_request_replaces_first() {
        let mut f = Fixture::new();
        f.stake(&op(1), 100_000, 1);
        let endpoint = f.approve(1);
        f.authorize(&op(1), 1, 50_000);
        f.ledger
            .request_authorization_decrease(&f.authorizer_at(2), &op(1), &app(1), amt(20_000))
            .unwrap();
        f.ledger
            .request_authorization_decrease(&f.authorizer_at(3), &op(1), &app(1), amt(5_000))
            .unwrap();
        assert_eq!(f.ledger.pending_decrease(&op(1), &app(1)), amt(5_000));
        assert_eq!(endpoint.received().len(), 3);

        let change = f
            .ledger
            .approve_authorization_decrease(&f.ctx(app(1).address().clone(), 4), &op(1))
            .unwrap();
        assert_eq!((change.from, change.to), (amt(50_000), amt(45_000)));
        assert_eq!(f.ledger.authorized(&op(1), &app(1)), amt(45_000));
        assert_eq!(f.ledger.pending_decrease(&op(1), &app(1)), Amount::ZERO);
    }

    #[test]
    fn unknown_caller_cannot_approve() {
        let mut f = Fixture::new();
        f.stake(&op(1), 100_000, 1);
        let err = f
            .ledger
            .approve_authorization_decrease(&f.ctx(addr(0x77), 3), &op(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ApplicationNotApproved);
    }

    #[test]
    fn full_decrease_of_nothing_is_zero_amount() {
        let mut f = Fixture::new();
        f.stake(&op(1), 100_000, 1);
        f.approve(1);
        let err = f
            .ledger
            .request_full_authorization_decrease(&f.authorizer_at(2), &op(1), &app(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ZeroAmount);
    }

    #[test]
    fn decrease_all_covers_every_application() {
        let mut f = Fixture::new();
        f.stake(&op(1), 100_000, 1);
        let first = f.approve(1);
        let second = f.approve(2);
        f.authorize(&op(1), 1, 10_000);
        f.authorize(&op(1), 2, 20_000);
        let requests = f
            .ledger
            .request_decrease_all(&f.authorizer_at(2), &op(1))
            .unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(f.ledger.pending_decrease(&op(1), &app(1)), amt(10_000));
        assert_eq!(f.ledger.pending_decrease(&op(1), &app(2)), amt(20_000));
        assert_eq!(first.received().len(), 2);
        assert_eq!(second.received().len(), 2);
    }

    #[test]
    fn decrease_all_rejection_applies_nothing() {
        let mut f = Fixture::new();
        f.stake(&op(1), 100_000, 1);
        f.approve(1);
        let second = f.approve(2);
        f.authorize(&op(1), 1, 10_000);
        f.authorize(&op(1), 2, 20_000);
        second.reject("busy");
        assert!(f
            .ledger
            .request_decrease_all(&f.authorizer_at(2), &op(1))
            .is_err());
        assert_eq!(f.ledger.pending_decrease(&op(1), &app(1)), Amount::ZERO);
    }

    #[test]
    fn force_decrease_requires_disabled_application() {
        let mut f = Fixture::new();
        f.stake(&op(1), 100_000, 1);
        f.approve(1);
        f.authorize(&op(1), 1, 10_000);
        let anyone = f.ctx(addr(0x77), 2);
        assert_eq!(
            f.ledger
                .force_decrease_authorization(&anyone, &op(1), &app(1))
                .unwrap_err()
                .kind(),
            ErrorKind::ApplicationNotDisabled
        );
        f.ledger
            .disable_application(&f.ctx(panic_address(), 2), &app(1))
            .unwrap();
        let change = f
            .ledger
            .force_decrease_authorization(&anyone, &op(1), &app(1))
            .unwrap();
        assert_eq!(change.from, amt(10_000));
        assert_eq!(f.ledger.authorized(&op(1), &app(1)), Amount::ZERO);
    }
}
