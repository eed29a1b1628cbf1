//! The authoritative in-session request collection
//!
//! [`RequestStore`] owns the requests and the [`Persistence`] adapter. Every
//! accepted mutation is mirrored to storage straight away. Storage failures
//! are logged and remembered but never interrupt in-memory operation.

use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{FuelingRequest, RequestDraft, RequestStatus};
use crate::persistence::Persistence;
use crate::seed::seed_requests;

/// Why `update` refused a replacement request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateRejection {
    #[error("request owner cannot change")]
    OwnerChanged,
    #[error("cannot move request from {from} to {to}")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },
    /// Existing messages were removed, reordered or edited
    #[error("messages are append-only")]
    MessagesRewritten,
    /// An appended message reuses an id already on the request
    #[error("message id {0} is already used on this request")]
    DuplicateMessageId(Uuid),
}

/// Result of [`RequestStore::update`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    /// No request has that id; nothing changed
    NotFound,
    /// The replacement breaks a request invariant; nothing changed
    Rejected(UpdateRejection),
}

/// Number of requests in each status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub confirmed: usize,
    pub completed: usize,
    pub cancelled: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.confirmed + self.completed + self.cancelled
    }
}

pub struct RequestStore {
    requests: Vec<FuelingRequest>,
    persistence: Persistence,
    last_save_error: Option<String>,
    /// Set when stored data exists but could not be read; nothing is
    /// written back so it cannot be overwritten
    detached: bool,
}

impl RequestStore {
    /// Opens the store, falling back to the seed dataset when nothing
    /// usable is stored. Seeding does not write anything by itself.
    ///
    /// If the storage cannot be read at all, the store shows the seed data
    /// and keeps every change in memory only.
    pub fn open(persistence: Persistence) -> Self {
        let (requests, detached) = match persistence.load() {
            Ok(Some(requests)) => {
                log::info!("Loaded {} stored requests", requests.len());
                (requests, false)
            }
            Ok(None) => {
                log::info!("No stored requests, using seed data");
                (seed_requests(), false)
            }
            Err(e) => {
                log::error!("Could not read stored requests, changes stay in memory: {}", e);
                (seed_requests(), true)
            }
        };

        Self {
            requests,
            persistence,
            last_save_error: None,
            detached,
        }
    }

    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    /// All requests, most recent first
    pub fn requests(&self) -> &[FuelingRequest] {
        &self.requests
    }

    pub fn get(&self, id: &Uuid) -> Option<&FuelingRequest> {
        self.requests.iter().find(|r| &r.id == id)
    }

    /// Requests whose id starts with `prefix` (case-insensitive)
    pub fn find_by_prefix(&self, prefix: &str) -> Vec<&FuelingRequest> {
        let prefix = prefix.trim().to_lowercase();
        if prefix.is_empty() {
            return Vec::new();
        }
        self.requests
            .iter()
            .filter(|r| r.id.to_string().starts_with(&prefix))
            .collect()
    }

    /// Creates a pending request for `client_id` and puts it first
    pub fn add(&mut self, draft: RequestDraft, client_id: &str) -> FuelingRequest {
        let mut request = FuelingRequest::new(draft, client_id);
        while self.get(&request.id).is_some() {
            request.id = Uuid::new_v4();
        }

        log::info!("Added request {} ({})", request.short_id(), request.summary());
        self.requests.insert(0, request.clone());
        self.persist();
        request
    }

    /// Replaces the stored request that has the same id.
    ///
    /// Unknown ids are a silent no-op reported as [`UpdateOutcome::NotFound`].
    /// Replacements that change the owner, take a status along an edge the
    /// lifecycle does not have, or rewrite earlier messages are refused.
    pub fn update(&mut self, request: FuelingRequest) -> UpdateOutcome {
        let Some(pos) = self.requests.iter().position(|r| r.id == request.id) else {
            log::debug!("Ignoring update for unknown request {}", request.id);
            return UpdateOutcome::NotFound;
        };

        if let Err(rejection) = check_replacement(&self.requests[pos], &request) {
            log::warn!("Rejected update for {}: {}", request.short_id(), rejection);
            return UpdateOutcome::Rejected(rejection);
        }

        self.requests[pos] = request;
        self.persist();
        UpdateOutcome::Updated
    }

    /// Removes every completed request, keeping the others in order.
    /// Returns how many were removed.
    pub fn remove_completed(&mut self) -> usize {
        let before = self.requests.len();
        self.requests.retain(|r| r.status != RequestStatus::Completed);
        let removed = before - self.requests.len();

        if removed > 0 {
            log::info!("Cleared {} completed requests", removed);
            self.persist();
        }
        removed
    }

    pub fn has_completed(&self) -> bool {
        self.requests
            .iter()
            .any(|r| r.status == RequestStatus::Completed)
    }

    /// Requests owned by `client_id` that carry the unread indicator
    pub fn unread_count_for(&self, client_id: &str) -> usize {
        self.requests
            .iter()
            .filter(|r| r.client_id == client_id && r.has_unread_updates)
            .count()
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for request in &self.requests {
            match request.status {
                RequestStatus::Pending => counts.pending += 1,
                RequestStatus::Confirmed => counts.confirmed += 1,
                RequestStatus::Completed => counts.completed += 1,
                RequestStatus::Cancelled => counts.cancelled += 1,
            }
        }
        counts
    }

    /// Takes the most recent write failure so it is reported only once
    pub fn take_save_error(&mut self) -> Option<String> {
        self.last_save_error.take()
    }

    fn persist(&mut self) {
        if self.detached {
            self.last_save_error =
                Some("stored requests could not be read, changes are kept in memory".to_string());
            return;
        }

        match self.persistence.save(&self.requests) {
            Ok(()) => self.last_save_error = None,
            Err(e) => {
                log::error!("Failed to save requests, continuing in memory: {}", e);
                self.last_save_error = Some(e.to_string());
            }
        }
    }
}

fn check_replacement(
    current: &FuelingRequest,
    replacement: &FuelingRequest,
) -> Result<(), UpdateRejection> {
    if current.client_id != replacement.client_id {
        return Err(UpdateRejection::OwnerChanged);
    }

    if current.status != replacement.status
        && !current.status.can_transition_to(replacement.status)
    {
        return Err(UpdateRejection::InvalidTransition {
            from: current.status,
            to: replacement.status,
        });
    }

    let kept = current.messages.len();
    if replacement.messages.len() < kept || replacement.messages[..kept] != current.messages[..] {
        return Err(UpdateRejection::MessagesRewritten);
    }

    let mut ids: HashSet<Uuid> = current.messages.iter().map(|m| m.id).collect();
    for message in &replacement.messages[kept..] {
        if !ids.insert(message.id) {
            return Err(UpdateRejection::DuplicateMessageId(message.id));
        }
    }

    Ok(())
}
