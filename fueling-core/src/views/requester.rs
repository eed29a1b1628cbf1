use std::time::Instant;
use uuid::Uuid;

use super::{modify, toggle_exclusive, ActionError};
use crate::config::ViewTiming;
use crate::models::{FuelingRequest, Message, RequestDraft, RequestStatus, Sender};
use crate::store::RequestStore;

pub const SUBMIT_LABEL: &str = "Submit Request";
pub const SUBMITTING_LABEL: &str = "Submitting...";
pub const SUBMITTED_TOAST: &str = "Fueling request submitted successfully!";

/// The four required form fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    StandNumber,
    Airline,
    FlightNumber,
    RepresentativeName,
}

impl FormField {
    pub const ALL: [FormField; 4] = [
        FormField::StandNumber,
        FormField::Airline,
        FormField::FlightNumber,
        FormField::RepresentativeName,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FormField::StandNumber => "Stand number",
            FormField::Airline => "Airline",
            FormField::FlightNumber => "Flight number",
            FormField::RepresentativeName => "Representative name",
        }
    }

    fn required_message(self) -> String {
        format!("{} is required", self.label())
    }
}

/// Contents of the new-request form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestForm {
    pub stand_number: String,
    pub airline: String,
    pub flight_number: String,
    pub representative_name: String,
}

impl RequestForm {
    pub fn value(&self, field: FormField) -> &str {
        match field {
            FormField::StandNumber => &self.stand_number,
            FormField::Airline => &self.airline,
            FormField::FlightNumber => &self.flight_number,
            FormField::RepresentativeName => &self.representative_name,
        }
    }

    pub fn value_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::StandNumber => &mut self.stand_number,
            FormField::Airline => &mut self.airline,
            FormField::FlightNumber => &mut self.flight_number,
            FormField::RepresentativeName => &mut self.representative_name,
        }
    }

    /// Checks every field; blank (after trimming) fields get an error
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        for field in FormField::ALL {
            if self.value(field).trim().is_empty() {
                *errors.slot_mut(field) = Some(field.required_message());
            }
        }
        errors
    }

    /// Trimmed copy of the form contents
    pub fn to_draft(&self) -> RequestDraft {
        RequestDraft {
            stand_number: self.stand_number.trim().to_string(),
            airline: self.airline.trim().to_string(),
            flight_number: self.flight_number.trim().to_string(),
            representative_name: self.representative_name.trim().to_string(),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Per-field validation messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub stand_number: Option<String>,
    pub airline: Option<String>,
    pub flight_number: Option<String>,
    pub representative_name: Option<String>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        FormField::ALL.iter().all(|f| self.get(*f).is_none())
    }

    pub fn get(&self, field: FormField) -> Option<&str> {
        match field {
            FormField::StandNumber => self.stand_number.as_deref(),
            FormField::Airline => self.airline.as_deref(),
            FormField::FlightNumber => self.flight_number.as_deref(),
            FormField::RepresentativeName => self.representative_name.as_deref(),
        }
    }

    /// Fields with an error, in form order
    pub fn iter(&self) -> impl Iterator<Item = (FormField, &str)> + '_ {
        FormField::ALL
            .into_iter()
            .filter_map(|f| self.get(f).map(|msg| (f, msg)))
    }

    fn slot_mut(&mut self, field: FormField) -> &mut Option<String> {
        match field {
            FormField::StandNumber => &mut self.stand_number,
            FormField::Airline => &mut self.airline,
            FormField::FlightNumber => &mut self.flight_number,
            FormField::RepresentativeName => &mut self.representative_name,
        }
    }
}

/// Result of pressing submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The request will be added once `due` has passed
    Scheduled { due: Instant },
    /// A submission is already in flight
    Busy,
    /// Validation failed; nothing was submitted
    Rejected(FieldErrors),
}

/// Transient acknowledgment shown after a successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub text: String,
    pub expires_at: Instant,
}

#[derive(Debug, Clone)]
struct PendingSubmission {
    draft: RequestDraft,
    due: Instant,
}

/// State of the requester screen for one device
pub struct RequesterView {
    requester_id: String,
    timing: ViewTiming,
    pub form: RequestForm,
    errors: FieldErrors,
    pending: Option<PendingSubmission>,
    toast: Option<Toast>,
    open_chat: Option<Uuid>,
}

impl RequesterView {
    pub fn new(requester_id: impl Into<String>, timing: ViewTiming) -> Self {
        Self {
            requester_id: requester_id.into(),
            timing,
            form: RequestForm::default(),
            errors: FieldErrors::default(),
            pending: None,
            toast: None,
            open_chat: None,
        }
    }

    pub fn requester_id(&self) -> &str {
        &self.requester_id
    }

    pub fn timing(&self) -> ViewTiming {
        self.timing
    }

    /// Errors from the last submit attempt
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Drops the error of a field the user is editing
    pub fn clear_field_error(&mut self, field: FormField) {
        *self.errors.slot_mut(field) = None;
    }

    /// Validates the form and schedules the submission.
    ///
    /// The request is not added here; [`RequesterView::poll`] adds it once
    /// the configured delay has elapsed. A scheduled submission cannot be
    /// withdrawn.
    pub fn submit(&mut self, now: Instant) -> SubmitOutcome {
        if self.pending.is_some() {
            return SubmitOutcome::Busy;
        }

        let errors = self.form.validate();
        if !errors.is_empty() {
            log::debug!("Form rejected with {} errors", errors.iter().count());
            self.errors = errors.clone();
            return SubmitOutcome::Rejected(errors);
        }

        self.errors = FieldErrors::default();
        let due = now + self.timing.submit_delay;
        self.pending = Some(PendingSubmission {
            draft: self.form.to_draft(),
            due,
        });
        SubmitOutcome::Scheduled { due }
    }

    /// Advances time-based state: expires the toast and completes a due
    /// submission. Returns the request added by this call, if any.
    pub fn poll(&mut self, now: Instant, store: &mut RequestStore) -> Option<FuelingRequest> {
        if self.toast.as_ref().is_some_and(|t| now >= t.expires_at) {
            self.toast = None;
        }

        if !self.pending.as_ref().is_some_and(|p| now >= p.due) {
            return None;
        }
        let pending = self.pending.take()?;

        let request = store.add(pending.draft, &self.requester_id);
        self.form.clear();
        self.toast = Some(Toast {
            text: SUBMITTED_TOAST.to_string(),
            expires_at: now + self.timing.toast_duration,
        });
        Some(request)
    }

    /// Earliest instant at which [`RequesterView::poll`] has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        let due = self.pending.as_ref().map(|p| p.due);
        let expiry = self.toast.as_ref().map(|t| t.expires_at);
        match (due, expiry) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.pending.is_some()
    }

    pub fn submit_label(&self) -> &'static str {
        if self.is_submitting() {
            SUBMITTING_LABEL
        } else {
            SUBMIT_LABEL
        }
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    pub fn dismiss_toast(&mut self) {
        self.toast = None;
    }

    /// This device's requests, pending ones first, otherwise in store order
    pub fn visible_requests<'a>(&self, store: &'a RequestStore) -> Vec<&'a FuelingRequest> {
        let mut visible: Vec<_> = store
            .requests()
            .iter()
            .filter(|r| r.client_id == self.requester_id)
            .collect();
        // sort_by_key is stable
        visible.sort_by_key(|r| r.status != RequestStatus::Pending);
        visible
    }

    pub fn open_chat(&self) -> Option<Uuid> {
        self.open_chat
    }

    /// Opens the chat of `id`, closing any other, or closes it if open.
    ///
    /// Opening acknowledges the request's updates right away.
    /// Returns whether the chat is now open.
    pub fn toggle_chat(&mut self, id: Uuid, store: &mut RequestStore) -> Result<bool, ActionError> {
        self.owned(id, store)?;

        let opened = toggle_exclusive(&mut self.open_chat, id);
        if opened && store.get(&id).is_some_and(|r| r.has_unread_updates) {
            modify(store, id, |request| {
                request.acknowledge_updates();
                Ok(())
            })?;
        }
        Ok(opened)
    }

    /// Sends a chat message on one of this device's requests
    pub fn send_message(
        &mut self,
        id: Uuid,
        text: &str,
        store: &mut RequestStore,
    ) -> Result<Message, ActionError> {
        self.owned(id, store)?;
        modify(store, id, |request| {
            Ok(request.append_message(Sender::Client, text)?.clone())
        })
    }

    fn owned(&self, id: Uuid, store: &RequestStore) -> Result<(), ActionError> {
        let request = store.get(&id).ok_or(ActionError::NotFound(id))?;
        if request.client_id != self.requester_id {
            return Err(ActionError::NotOwner(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelError;
    use crate::persistence::{Persistence, REQUESTS_KEY};
    use crate::storage::{KeyValueStore, MemoryKeyValueStore};
    use std::time::Duration;

    fn empty_store() -> RequestStore {
        let backend = MemoryKeyValueStore::new();
        backend.set(REQUESTS_KEY, "[]").unwrap();
        RequestStore::open(Persistence::new(Box::new(backend)))
    }

    fn fill(form: &mut RequestForm) {
        form.stand_number = "B7".into();
        form.airline = "Test Air".into();
        form.flight_number = "T1".into();
        form.representative_name = "X".into();
    }

    #[test]
    fn test_validate_reports_every_blank_field() {
        let form = RequestForm {
            stand_number: "  ".into(),
            airline: "Test Air".into(),
            ..RequestForm::default()
        };

        let errors = form.validate();

        let fields: Vec<_> = errors.iter().map(|(f, _)| f).collect();
        assert_eq!(
            fields,
            vec![
                FormField::StandNumber,
                FormField::FlightNumber,
                FormField::RepresentativeName
            ]
        );
        assert_eq!(
            errors.get(FormField::StandNumber),
            Some("Stand number is required")
        );
        assert!(errors.get(FormField::Airline).is_none());
    }

    #[test]
    fn test_invalid_submit_never_touches_store() {
        let mut store = empty_store();
        let mut view = RequesterView::new("device-1", ViewTiming::immediate());
        fill(&mut view.form);
        view.form.representative_name = "\t".into();
        let now = Instant::now();

        let outcome = view.submit(now);

        assert!(matches!(outcome, SubmitOutcome::Rejected(ref e) if !e.is_empty()));
        assert!(!view.is_submitting());
        assert!(view.poll(now, &mut store).is_none());
        assert!(store.requests().is_empty());
        assert!(view.errors().get(FormField::RepresentativeName).is_some());
    }

    #[test]
    fn test_submission_waits_for_delay() {
        let mut store = empty_store();
        let timing = ViewTiming {
            submit_delay: Duration::from_millis(500),
            toast_duration: Duration::from_secs(3),
        };
        let mut view = RequesterView::new("device-1", timing);
        fill(&mut view.form);
        let start = Instant::now();

        assert_eq!(
            view.submit(start),
            SubmitOutcome::Scheduled {
                due: start + Duration::from_millis(500)
            }
        );
        assert!(view.is_submitting());
        assert_eq!(view.submit_label(), SUBMITTING_LABEL);
        assert_eq!(view.submit(start), SubmitOutcome::Busy);

        assert!(view.poll(start + Duration::from_millis(499), &mut store).is_none());
        assert!(store.requests().is_empty());

        let added = view.poll(start + Duration::from_millis(500), &mut store).unwrap();
        assert_eq!(added.stand_number, "B7");
        assert_eq!(store.requests().len(), 1);
        assert!(!view.is_submitting());
        assert_eq!(view.submit_label(), SUBMIT_LABEL);
        assert_eq!(view.form, RequestForm::default());
    }

    #[test]
    fn test_toast_expires_after_duration() {
        let mut store = empty_store();
        let mut view = RequesterView::new("device-1", ViewTiming::immediate());
        fill(&mut view.form);
        let start = Instant::now();

        view.submit(start);
        view.poll(start, &mut store).unwrap();
        assert_eq!(view.toast().unwrap().text, SUBMITTED_TOAST);
        assert_eq!(view.next_deadline(), Some(start + Duration::from_secs(3)));

        view.poll(start + Duration::from_millis(2999), &mut store);
        assert!(view.toast().is_some());

        view.poll(start + Duration::from_secs(3), &mut store);
        assert!(view.toast().is_none());
        assert!(view.next_deadline().is_none());
    }

    #[test]
    fn test_submitted_values_are_trimmed_snapshot() {
        let mut store = empty_store();
        let mut view = RequesterView::new("device-1", ViewTiming::default());
        fill(&mut view.form);
        view.form.airline = "  Test Air  ".into();
        let start = Instant::now();

        view.submit(start);
        // Edits made while the submission is in flight do not leak into it
        view.form.airline = "Other".into();
        let added = view
            .poll(start + ViewTiming::default().submit_delay, &mut store)
            .unwrap();

        assert_eq!(added.airline, "Test Air");
    }

    #[test]
    fn test_visible_requests_own_only_pending_first() {
        let mut store = empty_store();
        let draft = || RequestDraft {
            stand_number: "S".into(),
            airline: "A".into(),
            flight_number: "F".into(),
            representative_name: "R".into(),
        };
        let mine_old = store.add(draft(), "device-1");
        let _theirs = store.add(draft(), "device-2");
        let mut mine_confirmed = store.add(draft(), "device-1");
        let mine_new = store.add(draft(), "device-1");
        mine_confirmed.transition_to(RequestStatus::Confirmed).unwrap();
        store.update(mine_confirmed.clone());

        let view = RequesterView::new("device-1", ViewTiming::immediate());
        let ids: Vec<_> = view.visible_requests(&store).iter().map(|r| r.id).collect();

        assert_eq!(ids, vec![mine_new.id, mine_old.id, mine_confirmed.id]);
    }

    #[test]
    fn test_opening_chat_acknowledges_updates() {
        let mut store = empty_store();
        let mut request = store.add(
            RequestForm {
                stand_number: "B7".into(),
                airline: "A".into(),
                flight_number: "F".into(),
                representative_name: "R".into(),
            }
            .to_draft(),
            "device-1",
        );
        request.transition_to(RequestStatus::Confirmed).unwrap();
        store.update(request.clone());
        let mut view = RequesterView::new("device-1", ViewTiming::immediate());

        assert!(view.toggle_chat(request.id, &mut store).unwrap());

        assert!(!store.get(&request.id).unwrap().has_unread_updates);
        assert_eq!(view.open_chat(), Some(request.id));

        assert!(!view.toggle_chat(request.id, &mut store).unwrap());
        assert_eq!(view.open_chat(), None);
    }

    #[test]
    fn test_chat_is_exclusive() {
        let mut store = empty_store();
        let mut view = RequesterView::new("device-1", ViewTiming::immediate());
        let draft = RequestForm {
            stand_number: "B7".into(),
            airline: "A".into(),
            flight_number: "F".into(),
            representative_name: "R".into(),
        }
        .to_draft();
        let first = store.add(draft.clone(), "device-1");
        let second = store.add(draft, "device-1");

        view.toggle_chat(first.id, &mut store).unwrap();
        view.toggle_chat(second.id, &mut store).unwrap();

        assert_eq!(view.open_chat(), Some(second.id));
    }

    #[test]
    fn test_cannot_chat_on_foreign_request() {
        let mut store = empty_store();
        let theirs = store.add(RequestDraft::default(), "device-2");
        let mut view = RequesterView::new("device-1", ViewTiming::immediate());

        assert_eq!(
            view.toggle_chat(theirs.id, &mut store),
            Err(ActionError::NotOwner(theirs.id))
        );
        assert_eq!(
            view.send_message(theirs.id, "hi", &mut store),
            Err(ActionError::NotOwner(theirs.id))
        );
        assert!(store.get(&theirs.id).unwrap().messages.is_empty());
    }

    #[test]
    fn test_requester_message_keeps_unread_state() {
        let mut store = empty_store();
        let request = store.add(RequestDraft::default(), "device-1");
        let mut view = RequesterView::new("device-1", ViewTiming::immediate());

        let message = view.send_message(request.id, " Ready? ", &mut store).unwrap();

        assert_eq!(message.sender, Sender::Client);
        assert_eq!(message.text, "Ready?");
        let stored = store.get(&request.id).unwrap();
        assert_eq!(stored.messages.len(), 1);
        assert!(!stored.has_unread_updates);

        assert_eq!(
            view.send_message(request.id, "", &mut store),
            Err(ActionError::Model(ModelError::EmptyMessage))
        );
    }
}
