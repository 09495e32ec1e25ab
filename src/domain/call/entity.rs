//! Call record

use super::patch::CallPatch;
use super::value_object::{CallDirection, CallStatus};
use crate::domain::shared::value_objects::{AgentId, CallId, CampaignId, ContactId, OrganizationId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single phone call, inbound or outbound.
///
/// The record is created by the initiator before dispatch and afterwards
/// only mutated field-by-field through [`CallPatch`]. `vapi_call_id` stays
/// `None` until the vendor accepts the dispatch; webhooks can never match a
/// record without it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub id: CallId,
    pub organization_id: OrganizationId,
    pub agent_id: Option<AgentId>,
    pub contact_id: Option<ContactId>,
    pub campaign_id: Option<CampaignId>,

    pub direction: CallDirection,
    pub status: CallStatus,
    pub to_number: Option<String>,
    pub from_number: Option<String>,

    /// Vendor-side identifier, unique when present
    pub vapi_call_id: Option<String>,

    pub transcript: Option<String>,
    pub recording_url: Option<String>,
    pub summary: Option<String>,
    pub sentiment: Option<String>,
    pub duration_seconds: Option<i32>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,

    /// Set once, when usage for the call is claimed for billing
    pub billed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for a new outbound call record
#[derive(Debug, Clone)]
pub struct NewOutboundCall {
    pub organization_id: OrganizationId,
    pub agent_id: AgentId,
    pub to_number: String,
    pub from_number: String,
    pub contact_id: Option<ContactId>,
    pub campaign_id: Option<CampaignId>,
}

impl Call {
    /// Create a pre-dispatch outbound call
    pub fn new_outbound(new: NewOutboundCall) -> Self {
        let now = Utc::now();
        Self {
            id: CallId::new(),
            organization_id: new.organization_id,
            agent_id: Some(new.agent_id),
            contact_id: new.contact_id,
            campaign_id: new.campaign_id,
            direction: CallDirection::Outbound,
            status: CallStatus::Queued,
            to_number: Some(new.to_number),
            from_number: Some(new.from_number),
            vapi_call_id: None,
            transcript: None,
            recording_url: None,
            summary: None,
            sentiment: None,
            duration_seconds: None,
            started_at: None,
            ended_at: None,
            billed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite every field the patch carries. Last write wins.
    pub fn apply(&mut self, patch: &CallPatch) {
        if let Some(status) = &patch.status {
            self.status = status.clone();
        }
        if let Some(vapi_call_id) = &patch.vapi_call_id {
            self.vapi_call_id = Some(vapi_call_id.clone());
        }
        if let Some(transcript) = &patch.transcript {
            self.transcript = Some(transcript.clone());
        }
        if let Some(recording_url) = &patch.recording_url {
            self.recording_url = Some(recording_url.clone());
        }
        if let Some(summary) = &patch.summary {
            self.summary = Some(summary.clone());
        }
        if let Some(sentiment) = &patch.sentiment {
            self.sentiment = Some(sentiment.clone());
        }
        if let Some(duration) = patch.duration_seconds {
            self.duration_seconds = Some(duration);
        }
        if let Some(started_at) = patch.started_at {
            self.started_at = Some(started_at);
        }
        if let Some(ended_at) = patch.ended_at {
            self.ended_at = Some(ended_at);
        }
        self.updated_at = Utc::now();
    }
}
