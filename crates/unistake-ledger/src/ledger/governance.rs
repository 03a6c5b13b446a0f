//! Application registry and governance parameters.

use std::sync::Arc;

use tracing::{info, warn};

use unistake_core::{Address, Amount, ApplicationId};
use unistake_state::ApplicationRecord;

use super::{rejected, require_nonzero, require_role, StakeLedger, TxContext};
use crate::application::Application;
use crate::error::{LedgerError, Role};
use crate::events::LedgerEvent;

impl StakeLedger {
    /// Approve an application, or re-enable a disabled one.
    ///
    /// Governance only. The endpoint's [`Application::id`] keys the record;
    /// on re-approval the new endpoint replaces the old one and existing
    /// authorizations are kept.
    pub fn approve_application(
        &mut self,
        ctx: &TxContext,
        endpoint: Arc<dyn Application>,
    ) -> Result<(), LedgerError> {
        self.try_approve_application(ctx, endpoint)
            .map_err(rejected("approve_application"))
    }

    fn try_approve_application(
        &mut self,
        ctx: &TxContext,
        endpoint: Arc<dyn Application>,
    ) -> Result<(), LedgerError> {
        self.require_governance(ctx)?;
        let application = endpoint.id();
        if application.address().is_zero() {
            return Err(LedgerError::InvalidRoleAddress {
                role: Role::Application,
            });
        }
        let mut record = self
            .applications
            .get(&application)
            .cloned()
            .unwrap_or_else(|| ApplicationRecord::new(application.clone()));
        if record.status.is_approved() && !record.status.is_disabled() {
            return Err(LedgerError::AlreadyApproved { application });
        }
        record.approve(ctx.caller.clone(), ctx.at)?;
        let event = self.prepare(
            ctx.at,
            LedgerEvent::ApplicationApproved {
                application: application.clone(),
            },
        )?;

        self.applications.insert(application.clone(), record);
        self.endpoints.insert(application.clone(), endpoint);
        self.append([event])?;
        info!(%application, "application approved");
        Ok(())
    }

    /// Set the address allowed to disable an application. Governance only.
    pub fn set_panic_button(
        &mut self,
        ctx: &TxContext,
        application: &ApplicationId,
        panic_address: Address,
    ) -> Result<(), LedgerError> {
        self.try_set_panic_button(ctx, application, panic_address)
            .map_err(rejected("set_panic_button"))
    }

    fn try_set_panic_button(
        &mut self,
        ctx: &TxContext,
        application: &ApplicationId,
        panic_address: Address,
    ) -> Result<(), LedgerError> {
        self.require_governance(ctx)?;
        require_nonzero(&panic_address, Role::PanicAddress)?;
        match self.applications.get(application) {
            Some(record) if record.status.is_approved() => {}
            _ => {
                return Err(LedgerError::ApplicationNotApproved {
                    application: application.clone(),
                })
            }
        }
        let event = self.prepare(
            ctx.at,
            LedgerEvent::PanicButtonSet {
                application: application.clone(),
                panic_address: panic_address.clone(),
            },
        )?;

        if let Some(record) = self.applications.get_mut(application) {
            record.set_panic_address(panic_address.clone());
        }
        self.append([event])?;
        info!(%application, %panic_address, "panic button set");
        Ok(())
    }

    /// Disable an application instantly. Only its panic address may call this.
    ///
    /// Authorizations at a disabled application still lock stake until they
    /// are force-decreased.
    pub fn disable_application(
        &mut self,
        ctx: &TxContext,
        application: &ApplicationId,
    ) -> Result<(), LedgerError> {
        self.try_disable_application(ctx, application)
            .map_err(rejected("disable_application"))
    }

    fn try_disable_application(
        &mut self,
        ctx: &TxContext,
        application: &ApplicationId,
    ) -> Result<(), LedgerError> {
        let mut record = match self.applications.get(application) {
            Some(record) if record.status.is_approved() => record.clone(),
            _ => {
                return Err(LedgerError::ApplicationNotApproved {
                    application: application.clone(),
                })
            }
        };
        match &record.panic_address {
            Some(panic) => require_role(&ctx.caller, panic, Role::PanicAddress)?,
            None => {
                return Err(LedgerError::NotAuthorizedRole {
                    caller: ctx.caller.clone(),
                    required: Role::PanicAddress,
                })
            }
        }
        if record.status.is_disabled() {
            return Err(LedgerError::ApplicationDisabled {
                application: application.clone(),
            });
        }
        record.disable(ctx.caller.clone(), ctx.at)?;
        let event = self.prepare(
            ctx.at,
            LedgerEvent::ApplicationDisabled {
                application: application.clone(),
                by: ctx.caller.clone(),
            },
        )?;

        self.applications.insert(application.clone(), record);
        self.append([event])?;
        warn!(%application, by = %ctx.caller, "application disabled");
        Ok(())
    }

    /// Set how many applications one operator may authorize. Governance only.
    ///
    /// Lowering the ceiling does not touch existing authorizations.
    pub fn set_authorization_ceiling(
        &mut self,
        ctx: &TxContext,
        ceiling: u32,
    ) -> Result<(), LedgerError> {
        self.require_governance(ctx)
            .and_then(|()| {
                let event = self.prepare(ctx.at, LedgerEvent::AuthorizationCeilingSet { ceiling })?;
                self.config.authorization_ceiling = ceiling;
                self.append([event])
            })
            .map_err(rejected("set_authorization_ceiling"))?;
        info!(ceiling, "authorization ceiling set");
        Ok(())
    }

    /// Set the minimum fresh commitment. Governance only.
    pub fn set_minimum_commitment(
        &mut self,
        ctx: &TxContext,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.require_governance(ctx)
            .and_then(|()| {
                let event = self.prepare(ctx.at, LedgerEvent::MinimumCommitmentSet { amount })?;
                self.config.minimum_commitment = amount;
                self.append([event])
            })
            .map_err(rejected("set_minimum_commitment"))?;
        info!(%amount, "minimum commitment set");
        Ok(())
    }

    /// Hand governance to another address. Governance only.
    pub fn transfer_governance(
        &mut self,
        ctx: &TxContext,
        new_governance: Address,
    ) -> Result<(), LedgerError> {
        self.require_governance(ctx)
            .and_then(|()| require_nonzero(&new_governance, Role::Governance))
            .and_then(|()| {
                let event = self.prepare(
                    ctx.at,
                    LedgerEvent::GovernanceTransferred {
                        from: self.config.governance.clone(),
                        to: new_governance.clone(),
                    },
                )?;
                self.config.governance = new_governance.clone();
                self.append([event])
            })
            .map_err(rejected("transfer_governance"))?;
        info!(to = %new_governance, "governance transferred");
        Ok(())
    }
}
