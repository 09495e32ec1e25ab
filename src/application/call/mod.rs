//! Call lifecycle use cases
//!
//! [`CallService`] is the only component that writes call records. Every
//! write is a [`CallPatch`](crate::domain::call::CallPatch) applied as a
//! field-level overwrite, so repeated or reordered deliveries converge on
//! last-write-wins per field rather than being serialized.

mod initiate;
mod lookup;
mod sync;
mod webhook;

#[cfg(test)]
mod test_support;

use crate::domain::agent::{AgentRepository, AgentSummary};
use crate::domain::billing::UsageRecorder;
use crate::domain::call::{Call, CallRepository, CallStatus};
use crate::domain::campaign::{CampaignRepository, CampaignSummary};
use crate::domain::contact::{ContactRepository, ContactSummary};
use crate::domain::guardrails::Guardrails;
use crate::domain::organization::OrganizationRepository;
use crate::domain::phone_number::PhoneNumberRepository;
use crate::domain::shared::value_objects::{AgentId, CampaignId, ContactId, OrganizationId};
use crate::domain::vendor::VoiceVendor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const AGENT_NOT_READY: &str = "Agent not found or not connected to voice system";
pub const NO_ACTIVE_NUMBER: &str = "No active phone number available";
pub const DISPATCH_FAILED: &str = "Failed to initiate call";
pub const CALL_NOT_FOUND: &str = "Call not found";
pub const CALL_NOT_RETRYABLE: &str = "Call not found or cannot be retried";
pub const RETRY_MISSING_DATA: &str = "Call missing required data for retry";

/// Persistence ports the service reads and writes
#[derive(Clone)]
pub struct Repositories {
    pub calls: Arc<dyn CallRepository>,
    pub agents: Arc<dyn AgentRepository>,
    pub contacts: Arc<dyn ContactRepository>,
    pub campaigns: Arc<dyn CampaignRepository>,
    pub phone_numbers: Arc<dyn PhoneNumberRepository>,
    pub organizations: Arc<dyn OrganizationRepository>,
}

/// Call orchestration: initiation, reconciliation, sync, lookup and retry
pub struct CallService {
    repos: Repositories,
    guardrails: Arc<dyn Guardrails>,
    usage: Arc<dyn UsageRecorder>,
    vendor: Arc<dyn VoiceVendor>,
}

impl CallService {
    pub fn new(
        repos: Repositories,
        guardrails: Arc<dyn Guardrails>,
        usage: Arc<dyn UsageRecorder>,
        vendor: Arc<dyn VoiceVendor>,
    ) -> Self {
        Self {
            repos,
            guardrails,
            usage,
            vendor,
        }
    }
}

/// Request to place an outbound call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitiateCallRequest {
    pub organization_id: OrganizationId,
    pub agent_id: AgentId,
    /// Destination number
    pub phone_number: String,
    pub contact_id: Option<ContactId>,
    pub campaign_id: Option<CampaignId>,
}

/// Normalized status event pushed by the voice platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallWebhookEvent {
    /// Vendor call ID
    pub call_id: String,
    pub status: CallStatus,
    pub transcript: Option<String>,
    pub recording_url: Option<String>,
    pub summary: Option<String>,
    pub sentiment: Option<String>,
    pub duration_seconds: Option<i32>,
}

impl CallWebhookEvent {
    pub fn new(call_id: impl Into<String>, status: CallStatus) -> Self {
        Self {
            call_id: call_id.into(),
            status,
            transcript: None,
            recording_url: None,
            summary: None,
            sentiment: None,
            duration_seconds: None,
        }
    }

    pub fn with_duration(mut self, duration_seconds: i32) -> Self {
        self.duration_seconds = Some(duration_seconds);
        self
    }
}

/// Call with summaries of its related records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallDetails {
    #[serde(flatten)]
    pub call: Call,
    pub agent: Option<AgentSummary>,
    pub campaign: Option<CampaignSummary>,
    pub contact: Option<ContactSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallPage {
    pub calls: Vec<Call>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallStats {
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
}
