use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Represents the status of a fueling request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestStatus::Pending => write!(f, "Pending"),
            RequestStatus::Confirmed => write!(f, "Confirmed"),
            RequestStatus::Completed => write!(f, "Completed"),
            RequestStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl RequestStatus {
    /// All statuses, in lifecycle order
    pub const ALL: [RequestStatus; 4] = [
        RequestStatus::Pending,
        RequestStatus::Confirmed,
        RequestStatus::Completed,
        RequestStatus::Cancelled,
    ];

    /// Completed and Cancelled requests accept no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Cancelled)
    }

    /// Returns true if `next` is reachable from this status in one step
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Confirmed)
                | (RequestStatus::Pending, RequestStatus::Completed)
                | (RequestStatus::Pending, RequestStatus::Cancelled)
                | (RequestStatus::Confirmed, RequestStatus::Completed)
                | (RequestStatus::Confirmed, RequestStatus::Cancelled)
        )
    }
}

/// Who wrote a chat message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The requester side
    Client,
    /// The operator side
    Company,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::Client => write!(f, "Client"),
            Sender::Company => write!(f, "Company"),
        }
    }
}

/// Errors raised by the request model itself
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("cannot move request from {from} to {to}")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },
    #[error("message text cannot be empty")]
    EmptyMessage,
}

/// One chat entry attached to a request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(sender: Sender, text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            text,
            timestamp: Utc::now(),
        }
    }

    /// Time of day the message was sent, in local time
    pub fn display_time(&self) -> String {
        self.timestamp
            .with_timezone(&chrono::Local)
            .format("%H:%M")
            .to_string()
    }
}

/// The four free-text fields a requester fills in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestDraft {
    pub stand_number: String,
    pub airline: String,
    pub flight_number: String,
    pub representative_name: String,
}

/// One fueling service request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FuelingRequest {
    /// Unique identifier, assigned at creation
    pub id: Uuid,
    /// Requester that created the request
    pub client_id: String,
    pub stand_number: String,
    pub airline: String,
    pub flight_number: String,
    pub representative_name: String,
    pub status: RequestStatus,
    /// Chat history, oldest first
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Set when the operator acts, cleared when the requester opens the chat
    #[serde(default)]
    pub has_unread_updates: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl FuelingRequest {
    /// Creates a new pending request owned by `client_id`
    pub fn new(draft: RequestDraft, client_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id: client_id.into(),
            stand_number: draft.stand_number,
            airline: draft.airline,
            flight_number: draft.flight_number,
            representative_name: draft.representative_name,
            status: RequestStatus::Pending,
            messages: Vec::new(),
            has_unread_updates: false,
            created_at: Utc::now(),
        }
    }

    /// Moves the request to `next` on behalf of the operator.
    ///
    /// Rejected transitions leave the request untouched. Accepted ones
    /// always raise the requester's unread indicator.
    pub fn transition_to(&mut self, next: RequestStatus) -> Result<(), ModelError> {
        if !self.status.can_transition_to(next) {
            return Err(ModelError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.has_unread_updates = true;
        Ok(())
    }

    /// Appends a chat message and returns it.
    ///
    /// Only operator messages raise the unread indicator; the requester's
    /// own messages leave it as it was.
    pub fn append_message(&mut self, sender: Sender, text: &str) -> Result<&Message, ModelError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ModelError::EmptyMessage);
        }

        let mut message = Message::new(sender, text.to_string());
        // Message ids stay unique within a request
        while self.messages.iter().any(|m| m.id == message.id) {
            message.id = Uuid::new_v4();
        }
        self.messages.push(message);

        if sender == Sender::Company {
            self.has_unread_updates = true;
        }

        Ok(&self.messages[self.messages.len() - 1])
    }

    /// Read acknowledgment from the requester side
    pub fn acknowledge_updates(&mut self) {
        self.has_unread_updates = false;
    }

    /// First eight characters of the id, used for display and lookup
    pub fn short_id(&self) -> String {
        self.id.to_string()[..8].to_string()
    }

    /// One-line summary used by list views
    pub fn summary(&self) -> String {
        format!(
            "Stand {} - {} {}",
            self.stand_number, self.airline, self.flight_number
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> RequestDraft {
        RequestDraft {
            stand_number: "B7".into(),
            airline: "Test Air".into(),
            flight_number: "T1".into(),
            representative_name: "X".into(),
        }
    }

    #[test]
    fn test_new_request_defaults() {
        let req = FuelingRequest::new(draft(), "device-1");

        assert_eq!(req.status, RequestStatus::Pending);
        assert!(req.messages.is_empty());
        assert!(!req.has_unread_updates);
        assert_eq!(req.client_id, "device-1");
        assert_eq!(req.stand_number, "B7");
    }

    #[test]
    fn test_allowed_transitions() {
        use RequestStatus::*;

        let allowed = [
            (Pending, Confirmed),
            (Pending, Completed),
            (Pending, Cancelled),
            (Confirmed, Completed),
            (Confirmed, Cancelled),
        ];

        for from in RequestStatus::ALL {
            for to in RequestStatus::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_terminal_statuses_have_no_targets() {
        for status in RequestStatus::ALL {
            let has_targets = RequestStatus::ALL
                .into_iter()
                .any(|next| status.can_transition_to(next));
            assert_eq!(status.is_terminal(), !has_targets, "{}", status);
        }
        assert!(RequestStatus::Cancelled.is_terminal());
        assert!(!RequestStatus::Confirmed.is_terminal());
    }

    #[test]
    fn test_transition_sets_unread() {
        let mut req = FuelingRequest::new(draft(), "device-1");

        req.transition_to(RequestStatus::Confirmed).unwrap();

        assert_eq!(req.status, RequestStatus::Confirmed);
        assert!(req.has_unread_updates);
    }

    #[test]
    fn test_rejected_transition_leaves_request_unchanged() {
        let mut req = FuelingRequest::new(draft(), "device-1");
        req.transition_to(RequestStatus::Cancelled).unwrap();
        req.acknowledge_updates();
        let before = req.clone();

        let result = req.transition_to(RequestStatus::Confirmed);

        assert_eq!(
            result,
            Err(ModelError::InvalidTransition {
                from: RequestStatus::Cancelled,
                to: RequestStatus::Confirmed,
            })
        );
        assert_eq!(req, before);
    }

    #[test]
    fn test_confirm_twice_is_rejected() {
        let mut req = FuelingRequest::new(draft(), "device-1");
        req.transition_to(RequestStatus::Confirmed).unwrap();

        assert!(req.transition_to(RequestStatus::Confirmed).is_err());
        assert_eq!(req.status, RequestStatus::Confirmed);
    }

    #[test]
    fn test_company_message_sets_unread() {
        let mut req = FuelingRequest::new(draft(), "device-1");

        req.append_message(Sender::Company, "Truck on the way").unwrap();

        assert!(req.has_unread_updates);
    }

    #[test]
    fn test_client_message_keeps_unread_flag() {
        let mut req = FuelingRequest::new(draft(), "device-1");
        req.append_message(Sender::Client, "Any news?").unwrap();
        assert!(!req.has_unread_updates);

        req.has_unread_updates = true;
        req.append_message(Sender::Client, "Still waiting").unwrap();
        assert!(req.has_unread_updates);
    }

    #[test]
    fn test_empty_message_rejected() {
        let mut req = FuelingRequest::new(draft(), "device-1");

        assert_eq!(
            req.append_message(Sender::Client, "   ").unwrap_err(),
            ModelError::EmptyMessage
        );
        assert!(req.messages.is_empty());
    }

    #[test]
    fn test_messages_append_in_order_with_unique_ids() {
        let mut req = FuelingRequest::new(draft(), "device-1");
        for i in 0..20 {
            let sender = if i % 2 == 0 { Sender::Client } else { Sender::Company };
            req.append_message(sender, &format!("message {}", i)).unwrap();
        }

        let texts: Vec<_> = req.messages.iter().map(|m| m.text.as_str()).collect();
        let expected: Vec<_> = (0..20).map(|i| format!("message {}", i)).collect();
        assert_eq!(texts, expected);

        let ids: std::collections::HashSet<_> = req.messages.iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), 20);
    }

    #[test]
    fn test_serialized_field_names() {
        let mut req = FuelingRequest::new(draft(), "device-1");
        req.append_message(Sender::Company, "Hello").unwrap();

        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["clientId"], "device-1");
        assert_eq!(json["standNumber"], "B7");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["hasUnreadUpdates"], true);
        assert_eq!(json["messages"][0]["sender"], "company");
        assert!(json["messages"][0]["timestamp"].is_string());
    }
}
