//! Partial updates to a call record

use super::value_object::CallStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Field-level update. `None` leaves the stored value untouched.
///
/// Every write path (dispatch result, webhook, poll sync) goes through a
/// patch, so re-applying the same patch always yields the same record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallPatch {
    pub status: Option<CallStatus>,
    pub vapi_call_id: Option<String>,
    pub transcript: Option<String>,
    pub recording_url: Option<String>,
    pub summary: Option<String>,
    pub sentiment: Option<String>,
    pub duration_seconds: Option<i32>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl CallPatch {
    pub fn status(status: CallStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Dispatch accepted by the vendor
    pub fn dispatched(vapi_call_id: String, status: CallStatus) -> Self {
        Self {
            status: Some(status),
            vapi_call_id: Some(vapi_call_id),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
