//! # Application Endpoints
//!
//! An application consumes authorized stake. The ledger notifies it
//! synchronously before an increase or a decrease request takes effect;
//! a rejection aborts the operation with nothing applied.
//!
//! The ledger only acts on success or failure. Applications call back into
//! the ledger through [`StakeLedger::approve_authorization_decrease`] using
//! their own address as caller.
//!
//! [`StakeLedger::approve_authorization_decrease`]: crate::StakeLedger::approve_authorization_decrease

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use unistake_core::{Amount, ApplicationId, OperatorId};

/// An application's refusal of a notification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ApplicationRejection(pub String);

/// The ledger-facing side of an application.
pub trait Application: std::fmt::Debug + Send + Sync {
    /// The application's identity. Stable for the lifetime of the endpoint.
    fn id(&self) -> ApplicationId;

    /// Called before an operator's authorization grows from `from` to `to`.
    fn authorization_increased(
        &self,
        operator: &OperatorId,
        from: Amount,
        to: Amount,
    ) -> Result<(), ApplicationRejection>;

    /// Called before a decrease request from `from` to `to` is registered.
    fn authorization_decrease_requested(
        &self,
        operator: &OperatorId,
        from: Amount,
        to: Amount,
    ) -> Result<(), ApplicationRejection>;
}

/// A notification received by a [`RecordingApplication`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// An authorization increase.
    Increased {
        /// The operator.
        operator: OperatorId,
        /// Authorized before.
        from: Amount,
        /// Authorized after.
        to: Amount,
    },
    /// A decrease request.
    DecreaseRequested {
        /// The operator.
        operator: OperatorId,
        /// Authorized at request time.
        from: Amount,
        /// Authorized once approved.
        to: Amount,
    },
}

/// An application that records every notification and can be told to
/// reject the next ones.
#[derive(Debug)]
pub struct RecordingApplication {
    id: ApplicationId,
    received: Mutex<Vec<Notification>>,
    reject_with: Mutex<Option<String>>,
}

impl RecordingApplication {
    /// An application accepting every notification.
    pub fn new(id: ApplicationId) -> Self {
        Self {
            id,
            received: Mutex::new(Vec::new()),
            reject_with: Mutex::new(None),
        }
    }

    /// Reject notifications with `reason` until [`accept`](Self::accept) is called.
    pub fn reject(&self, reason: impl Into<String>) {
        *self.reject_with.lock() = Some(reason.into());
    }

    /// Accept notifications again.
    pub fn accept(&self) {
        *self.reject_with.lock() = None;
    }

    /// Notifications accepted so far, oldest first.
    pub fn received(&self) -> Vec<Notification> {
        self.received.lock().clone()
    }

    fn record(&self, notification: Notification) -> Result<(), ApplicationRejection> {
        if let Some(reason) = self.reject_with.lock().as_ref() {
            return Err(ApplicationRejection(reason.clone()));
        }
        self.received.lock().push(notification);
        Ok(())
    }
}

impl Application for RecordingApplication {
    fn id(&self) -> ApplicationId {
        self.id.clone()
    }

    fn authorization_increased(
        &self,
        operator: &OperatorId,
        from: Amount,
        to: Amount,
    ) -> Result<(), ApplicationRejection> {
        self.record(Notification::Increased {
            operator: operator.clone(),
            from,
            to,
        })
    }

    fn authorization_decrease_requested(
        &self,
        operator: &OperatorId,
        from: Amount,
        to: Amount,
    ) -> Result<(), ApplicationRejection> {
        self.record(Notification::DecreaseRequested {
            operator: operator.clone(),
            from,
            to,
        })
    }
}
