//! Call value objects

use crate::domain::contact::ContactStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Call direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallDirection {
    /// Call placed by a customer to one of the organization's numbers
    Inbound,
    /// Call placed by an agent
    Outbound,
}

impl CallDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallDirection::Inbound => "inbound",
            CallDirection::Outbound => "outbound",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "inbound" => Some(CallDirection::Inbound),
            "outbound" => Some(CallDirection::Outbound),
            _ => None,
        }
    }
}

/// Statuses after which the vendor will not report further progress.
pub const TERMINAL_STATUSES: &[&str] = &["completed", "failed", "no-answer", "ended"];

/// Call status
///
/// Vendor-defined states we don't model are carried verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CallStatus {
    Queued,
    Ringing,
    InProgress,
    Answered,
    Completed,
    Failed,
    NoAnswer,
    Other(String),
}

impl CallStatus {
    pub fn as_str(&self) -> &str {
        match self {
            CallStatus::Queued => "queued",
            CallStatus::Ringing => "ringing",
            CallStatus::InProgress => "in-progress",
            CallStatus::Answered => "answered",
            CallStatus::Completed => "completed",
            CallStatus::Failed => "failed",
            CallStatus::NoAnswer => "no-answer",
            CallStatus::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "queued" => CallStatus::Queued,
            "ringing" => CallStatus::Ringing,
            "in-progress" => CallStatus::InProgress,
            "answered" => CallStatus::Answered,
            "completed" => CallStatus::Completed,
            "failed" => CallStatus::Failed,
            "no-answer" => CallStatus::NoAnswer,
            other => CallStatus::Other(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        TERMINAL_STATUSES.contains(&self.as_str())
    }

    /// Only failed and unanswered calls may be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, CallStatus::Failed | CallStatus::NoAnswer)
    }

    /// Contact status implied by this call status, if any.
    pub fn contact_status(&self) -> Option<ContactStatus> {
        match self {
            CallStatus::Completed => Some(ContactStatus::Completed),
            CallStatus::Failed | CallStatus::NoAnswer => Some(ContactStatus::Failed),
            _ => None,
        }
    }
}

impl From<String> for CallStatus {
    fn from(s: String) -> Self {
        CallStatus::parse(&s)
    }
}

impl From<&str> for CallStatus {
    fn from(s: &str) -> Self {
        CallStatus::parse(s)
    }
}

impl From<CallStatus> for String {
    fn from(status: CallStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_known_and_passthrough() {
        assert_eq!(CallStatus::parse("no-answer"), CallStatus::NoAnswer);
        assert_eq!(CallStatus::parse("in-progress"), CallStatus::InProgress);
        assert_eq!(
            CallStatus::parse("forwarding"),
            CallStatus::Other("forwarding".to_string())
        );
        assert_eq!(CallStatus::Other("forwarding".to_string()).as_str(), "forwarding");
    }

    #[test]
    fn test_status_serde_as_plain_string() {
        let json = serde_json::to_string(&CallStatus::NoAnswer).unwrap();
        assert_eq!(json, "\"no-answer\"");
        let status: CallStatus = serde_json::from_str("\"ended\"").unwrap();
        assert_eq!(status, CallStatus::Other("ended".to_string()));
    }

    #[test]
    fn test_contact_status_mapping() {
        assert_eq!(CallStatus::Completed.contact_status(), Some(ContactStatus::Completed));
        assert_eq!(CallStatus::Failed.contact_status(), Some(ContactStatus::Failed));
        assert_eq!(CallStatus::NoAnswer.contact_status(), Some(ContactStatus::Failed));
        assert_eq!(CallStatus::Ringing.contact_status(), None);
        assert_eq!(CallStatus::Queued.contact_status(), None);
        assert_eq!(CallStatus::Other("ended".into()).contact_status(), None);
    }

    #[test]
    fn test_terminal_and_retryable() {
        assert!(CallStatus::Completed.is_terminal());
        assert!(CallStatus::Other("ended".into()).is_terminal());
        assert!(!CallStatus::Ringing.is_terminal());

        assert!(CallStatus::Failed.is_retryable());
        assert!(CallStatus::NoAnswer.is_retryable());
        assert!(!CallStatus::Completed.is_retryable());
        assert!(!CallStatus::Queued.is_retryable());
    }

    #[test]
    fn test_direction() {
        assert_eq!(CallDirection::Outbound.as_str(), "outbound");
        assert_eq!(CallDirection::parse("inbound"), Some(CallDirection::Inbound));
        assert_eq!(CallDirection::parse("internal"), None);
    }
}
