//! Demo dataset used when nothing has been stored yet

use chrono::{Duration, Utc};

use crate::models::{FuelingRequest, ModelError, RequestDraft, RequestStatus, Sender};

/// Owner of the seeded requests; never matches a generated device id
pub const SEED_CLIENT_ID: &str = "demo-client";

fn draft(stand: &str, airline: &str, flight: &str, representative: &str) -> RequestDraft {
    RequestDraft {
        stand_number: stand.to_string(),
        airline: airline.to_string(),
        flight_number: flight.to_string(),
        representative_name: representative.to_string(),
    }
}

/// Builds the seed requests, most recent first.
///
/// Returns an empty collection if a seed request breaks a model rule.
pub fn seed_requests() -> Vec<FuelingRequest> {
    build_seed().unwrap_or_else(|e| {
        log::error!("Seed data is invalid, starting empty: {}", e);
        Vec::new()
    })
}

fn build_seed() -> Result<Vec<FuelingRequest>, ModelError> {
    let now = Utc::now();

    let mut pending = FuelingRequest::new(
        draft("A12", "Aurora Airlines", "AU215", "Maria Lopez"),
        SEED_CLIENT_ID,
    );
    pending.created_at = now - Duration::minutes(5);

    // Seed requests follow the same rules as live ones
    let mut confirmed = FuelingRequest::new(
        draft("C3", "Polar Express", "PX88", "Tom Berg"),
        SEED_CLIENT_ID,
    );
    confirmed.created_at = now - Duration::minutes(40);
    confirmed.transition_to(RequestStatus::Confirmed)?;
    confirmed.append_message(Sender::Client, "Please bring the second truck as well.")?;
    confirmed.append_message(Sender::Company, "Both trucks are scheduled for 14:30.")?;

    let mut completed = FuelingRequest::new(
        draft("B7", "Sky Regional", "SR401", "Ann Kim"),
        SEED_CLIENT_ID,
    );
    completed.created_at = now - Duration::hours(3);
    completed.transition_to(RequestStatus::Confirmed)?;
    completed.transition_to(RequestStatus::Completed)?;

    Ok(vec![pending, confirmed, completed])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_follows_model_rules() {
        let requests = build_seed().unwrap();

        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].messages[0].sender, Sender::Client);
        assert_ne!(requests[1].messages[0].id, requests[1].messages[1].id);
    }

    #[test]
    fn test_seed_covers_statuses() {
        let requests = seed_requests();

        let statuses: Vec<_> = requests.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                RequestStatus::Pending,
                RequestStatus::Confirmed,
                RequestStatus::Completed
            ]
        );
        assert!(requests.iter().all(|r| r.client_id == SEED_CLIENT_ID));
        assert_eq!(requests[1].messages.len(), 2);
    }
}
