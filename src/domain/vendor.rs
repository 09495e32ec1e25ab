//! Voice platform port
//!
//! The platform places the actual phone call and runs the conversation.
//! We only create calls and read their state back.

use crate::domain::shared::value_objects::{CallId, OrganizationId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VendorError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    /// Anything else the platform client raised
    #[error("{0}")]
    Other(String),
}

/// Outbound call dispatch request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorCallRequest {
    pub assistant_id: String,
    /// Platform-side identity of the originating number, when provisioned
    pub phone_number_id: Option<String>,
    pub from_number: String,
    pub to_number: String,
    pub first_message: String,
    pub system_prompt: String,
    /// Echoed back by the platform in webhooks
    pub call_id: CallId,
    pub organization_id: OrganizationId,
}

/// Immediate dispatch response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorCall {
    pub id: String,
    pub status: String,
}

/// Authoritative call state fetched from the platform
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VendorCallState {
    pub status: String,
    pub transcript: Option<String>,
    pub recording_url: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoiceVendor: Send + Sync {
    /// Dispatch an outbound call
    async fn create_call(&self, request: VendorCallRequest) -> Result<VendorCall, VendorError>;

    /// Fetch the current state of a call
    async fn get_call(&self, vapi_call_id: &str) -> Result<VendorCallState, VendorError>;
}
