use std::fmt;
use uuid::Uuid;

use super::{modify, toggle_exclusive, ActionError};
use crate::models::{FuelingRequest, Message, RequestStatus, Sender};
use crate::store::RequestStore;

/// Whether a control is usable. Denied controls are shown disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Allowed,
    Denied,
}

impl Capability {
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }

    pub const fn from_bool(value: bool) -> Self {
        if value {
            Self::Allowed
        } else {
            Self::Denied
        }
    }
}

/// Status-changing actions available to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorAction {
    Confirm,
    Complete,
    Cancel,
}

impl OperatorAction {
    pub fn target_status(self) -> RequestStatus {
        match self {
            OperatorAction::Confirm => RequestStatus::Confirmed,
            OperatorAction::Complete => RequestStatus::Completed,
            OperatorAction::Cancel => RequestStatus::Cancelled,
        }
    }
}

impl fmt::Display for OperatorAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorAction::Confirm => write!(f, "confirm"),
            OperatorAction::Complete => write!(f, "complete"),
            OperatorAction::Cancel => write!(f, "cancel"),
        }
    }
}

/// Enabled state of the per-request controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestControls {
    pub confirm: Capability,
    pub complete: Capability,
    pub cancel: Capability,
}

impl RequestControls {
    pub fn for_action(&self, action: OperatorAction) -> Capability {
        match action {
            OperatorAction::Confirm => self.confirm,
            OperatorAction::Complete => self.complete,
            OperatorAction::Cancel => self.cancel,
        }
    }
}

/// A destructive action waiting for the operator to confirm it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingConfirmation {
    Cancel(Uuid),
    ClearCompleted,
}

impl PendingConfirmation {
    pub fn title(&self) -> &'static str {
        match self {
            PendingConfirmation::Cancel(_) => "Cancel request",
            PendingConfirmation::ClearCompleted => "Clear completed requests",
        }
    }

    pub fn prompt(&self) -> &'static str {
        match self {
            PendingConfirmation::Cancel(_) => {
                "Are you sure you want to cancel this fueling request?"
            }
            PendingConfirmation::ClearCompleted => {
                "Remove all completed requests? This cannot be undone."
            }
        }
    }
}

/// How a confirmation was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The status change went through
    Applied,
    /// Completed requests were removed; holds how many
    Cleared(usize),
    /// The operator said no; nothing changed
    Declined,
}

/// State of the operator screen
#[derive(Debug, Default)]
pub struct OperatorView {
    open_chat: Option<Uuid>,
    pending: Option<PendingConfirmation>,
}

impl OperatorView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request, in store order
    pub fn visible_requests<'a>(&self, store: &'a RequestStore) -> &'a [FuelingRequest] {
        store.requests()
    }

    pub fn controls(&self, request: &FuelingRequest) -> RequestControls {
        let allowed = |action: OperatorAction| {
            Capability::from_bool(request.status.can_transition_to(action.target_status()))
        };
        RequestControls {
            confirm: allowed(OperatorAction::Confirm),
            complete: allowed(OperatorAction::Complete),
            cancel: allowed(OperatorAction::Cancel),
        }
    }

    pub fn confirm(&mut self, id: Uuid, store: &mut RequestStore) -> Result<(), ActionError> {
        self.apply(OperatorAction::Confirm, id, store)
    }

    pub fn complete(&mut self, id: Uuid, store: &mut RequestStore) -> Result<(), ActionError> {
        self.apply(OperatorAction::Complete, id, store)
    }

    /// Stages cancellation of `id`; it happens only once confirmed
    pub fn request_cancel(
        &mut self,
        id: Uuid,
        store: &RequestStore,
    ) -> Result<PendingConfirmation, ActionError> {
        self.check_nothing_staged()?;
        let request = store.get(&id).ok_or(ActionError::NotFound(id))?;
        self.check_allowed(OperatorAction::Cancel, request)?;

        let pending = PendingConfirmation::Cancel(id);
        self.pending = Some(pending);
        Ok(pending)
    }

    /// Stages removal of all completed requests
    pub fn request_clear_completed(
        &mut self,
        store: &RequestStore,
    ) -> Result<PendingConfirmation, ActionError> {
        self.check_nothing_staged()?;
        if !self.can_clear_completed(store) {
            return Err(ActionError::NothingToClear);
        }

        let pending = PendingConfirmation::ClearCompleted;
        self.pending = Some(pending);
        Ok(pending)
    }

    pub fn pending_confirmation(&self) -> Option<PendingConfirmation> {
        self.pending
    }

    /// Applies (`accepted`) or discards the staged action
    pub fn resolve_confirmation(
        &mut self,
        accepted: bool,
        store: &mut RequestStore,
    ) -> Result<ActionOutcome, ActionError> {
        let pending = self.pending.take().ok_or(ActionError::NothingToConfirm)?;
        if !accepted {
            log::debug!("Operator declined: {}", pending.title());
            return Ok(ActionOutcome::Declined);
        }

        match pending {
            // The request may have changed while the prompt was open
            PendingConfirmation::Cancel(id) => {
                self.apply(OperatorAction::Cancel, id, store)?;
                Ok(ActionOutcome::Applied)
            }
            PendingConfirmation::ClearCompleted => {
                let removed = store.remove_completed();
                if self.open_chat.is_some_and(|id| store.get(&id).is_none()) {
                    self.open_chat = None;
                }
                Ok(ActionOutcome::Cleared(removed))
            }
        }
    }

    /// The clear-completed control is shown only when there is something to clear
    pub fn can_clear_completed(&self, store: &RequestStore) -> bool {
        store.has_completed()
    }

    pub fn open_chat(&self) -> Option<Uuid> {
        self.open_chat
    }

    /// Opens the chat of `id`, closing any other, or closes it if open.
    /// Returns whether the chat is now open.
    pub fn toggle_chat(&mut self, id: Uuid) -> bool {
        toggle_exclusive(&mut self.open_chat, id)
    }

    /// Sends a chat message as the operator; raises the requester's unread indicator
    pub fn send_message(
        &mut self,
        id: Uuid,
        text: &str,
        store: &mut RequestStore,
    ) -> Result<Message, ActionError> {
        modify(store, id, |request| {
            Ok(request.append_message(Sender::Company, text)?.clone())
        })
    }

    /// An open confirmation must be answered before another is staged
    fn check_nothing_staged(&self) -> Result<(), ActionError> {
        match self.pending {
            Some(_) => Err(ActionError::ConfirmationPending),
            None => Ok(()),
        }
    }

    fn check_allowed(
        &self,
        action: OperatorAction,
        request: &FuelingRequest,
    ) -> Result<(), ActionError> {
        if self.controls(request).for_action(action).is_allowed() {
            Ok(())
        } else {
            Err(ActionError::NotAllowed {
                action,
                status: request.status,
            })
        }
    }

    fn apply(
        &self,
        action: OperatorAction,
        id: Uuid,
        store: &mut RequestStore,
    ) -> Result<(), ActionError> {
        let request = store.get(&id).ok_or(ActionError::NotFound(id))?;
        self.check_allowed(action, request)?;

        modify(store, id, |request| {
            request.transition_to(action.target_status())?;
            Ok(())
        })?;
        log::info!("Operator applied {} to request {}", action, id);
        Ok(())
    }
}
