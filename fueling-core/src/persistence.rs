//! Persistence adapter
//!
//! Mirrors the request collection into a [`KeyValueStore`] as one JSON
//! document, and hands out the per-device requester identifier.

use thiserror::Error;
use uuid::Uuid;

use crate::models::FuelingRequest;
use crate::storage::{KeyValueStore, StorageError};

/// Key holding the serialized request collection
pub const REQUESTS_KEY: &str = "fueling_requests";
/// Key holding the plain-string requester identifier
pub const REQUESTER_ID_KEY: &str = "requester_id";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("failed to serialize requests: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Reads and writes the request collection and the requester id
pub struct Persistence {
    backend: Box<dyn KeyValueStore>,
}

impl Persistence {
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Loads the stored collection.
    ///
    /// Returns `Ok(None)` when nothing is stored or the stored document is
    /// malformed; callers fall back to seed data in both cases. A failure to
    /// read the backend is an error, since the data may still be there.
    pub fn load(&self) -> Result<Option<Vec<FuelingRequest>>, PersistenceError> {
        let Some(raw) = self.backend.get(REQUESTS_KEY)? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(requests) => Ok(Some(requests)),
            Err(e) => {
                log::warn!("Ignoring malformed stored requests: {}", e);
                Ok(None)
            }
        }
    }

    /// Writes the whole collection
    pub fn save(&self, requests: &[FuelingRequest]) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(requests)?;
        self.backend.set(REQUESTS_KEY, &json)?;
        log::debug!("Saved {} requests", requests.len());
        Ok(())
    }

    /// Returns this device's requester id, creating it on first use.
    ///
    /// The id is stored under its own key. If the new id cannot be stored it
    /// is still returned, so the current session keeps working.
    pub fn get_or_create_requester_id(&self) -> Result<String, PersistenceError> {
        if let Some(existing) = self.backend.get(REQUESTER_ID_KEY)? {
            let existing = existing.trim();
            if !existing.is_empty() {
                return Ok(existing.to_string());
            }
        }

        let id = Uuid::new_v4().to_string();
        if let Err(e) = self.backend.set(REQUESTER_ID_KEY, &id) {
            log::error!("Could not store requester id, it will change next run: {}", e);
        } else {
            log::info!("Created requester id {}", id);
        }
        Ok(id)
    }
}
