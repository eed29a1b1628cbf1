//! Business logic behind the two role views
//!
//! The views hold UI state (form contents, which chat is open, pending
//! confirmations) and talk to the [`RequestStore`] only through its public
//! operations. Rendering lives in the front-end crates.

mod operator;
mod requester;

pub use operator::{
    ActionOutcome, Capability, OperatorAction, OperatorView, PendingConfirmation,
    RequestControls,
};
pub use requester::{FieldErrors, FormField, RequestForm, RequesterView, SubmitOutcome, Toast};

use thiserror::Error;
use uuid::Uuid;

use crate::models::{FuelingRequest, ModelError, RequestStatus};
use crate::store::{RequestStore, UpdateOutcome, UpdateRejection};

/// Errors returned by view actions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("request {0} not found")]
    NotFound(Uuid),
    #[error("request {0} belongs to another requester")]
    NotOwner(Uuid),
    #[error("cannot {action} a request that is {status}")]
    NotAllowed {
        action: OperatorAction,
        status: RequestStatus,
    },
    #[error("there are no completed requests to clear")]
    NothingToClear,
    #[error("there is no action waiting for confirmation")]
    NothingToConfirm,
    #[error("another action is waiting for confirmation")]
    ConfirmationPending,
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("update rejected: {0}")]
    Rejected(UpdateRejection),
}

/// Clones the request with `id`, applies `change`, and writes it back
fn modify<T>(
    store: &mut RequestStore,
    id: Uuid,
    change: impl FnOnce(&mut FuelingRequest) -> Result<T, ActionError>,
) -> Result<T, ActionError> {
    let mut request = store.get(&id).cloned().ok_or(ActionError::NotFound(id))?;
    let value = change(&mut request)?;

    match store.update(request) {
        UpdateOutcome::Updated => Ok(value),
        UpdateOutcome::NotFound => Err(ActionError::NotFound(id)),
        UpdateOutcome::Rejected(rejection) => Err(ActionError::Rejected(rejection)),
    }
}

/// Flips an exclusive open-chat slot: opening one closes any other
fn toggle_exclusive(slot: &mut Option<Uuid>, id: Uuid) -> bool {
    if *slot == Some(id) {
        *slot = None;
        false
    } else {
        *slot = Some(id);
        true
    }
}
