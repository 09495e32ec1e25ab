//! Vapi REST client

use crate::domain::vendor::{
    VendorCall, VendorCallRequest, VendorCallState, VendorError, VoiceVendor,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

impl From<reqwest::Error> for VendorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            VendorError::Decode(e.to_string())
        } else {
            VendorError::Transport(e.to_string())
        }
    }
}

#[derive(Clone)]
pub struct VapiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl VapiClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, VendorError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn send<R: for<'de> Deserialize<'de>>(
        &self,
        request: RequestBuilder,
    ) -> Result<R, VendorError> {
        let response = request
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(VendorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCallBody<'a> {
    assistant_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone_number_id: Option<&'a str>,
    customer: Customer<'a>,
    assistant_overrides: AssistantOverrides<'a>,
    metadata: CallMetadata<'a>,
}

impl<'a> CreateCallBody<'a> {
    fn from_request(request: &'a VendorCallRequest) -> Self {
        CreateCallBody {
            assistant_id: &request.assistant_id,
            phone_number_id: request.phone_number_id.as_deref(),
            customer: Customer {
                number: &request.to_number,
            },
            assistant_overrides: AssistantOverrides {
                first_message: &request.first_message,
                model: ModelOverride {
                    messages: [ChatMessage {
                        role: "system",
                        content: &request.system_prompt,
                    }],
                },
            },
            metadata: CallMetadata {
                call_id: request.call_id.to_string(),
                organization_id: request.organization_id.to_string(),
                from_number: &request.from_number,
            },
        }
    }
}

#[derive(Serialize)]
struct Customer<'a> {
    number: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AssistantOverrides<'a> {
    first_message: &'a str,
    model: ModelOverride<'a>,
}

#[derive(Serialize)]
struct ModelOverride<'a> {
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CallMetadata<'a> {
    call_id: String,
    organization_id: String,
    from_number: &'a str,
}

#[derive(Deserialize)]
struct CreateCallResponse {
    id: String,
    #[serde(default)]
    status: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallResponse {
    #[serde(default)]
    status: String,
    transcript: Option<String>,
    recording_url: Option<String>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    artifact: Option<Artifact>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Artifact {
    transcript: Option<String>,
    recording_url: Option<String>,
}

impl From<CallResponse> for VendorCallState {
    fn from(r: CallResponse) -> Self {
        let (artifact_transcript, artifact_recording) = r
            .artifact
            .map(|a| (a.transcript, a.recording_url))
            .unwrap_or_default();
        VendorCallState {
            status: r.status,
            transcript: r.transcript.or(artifact_transcript),
            recording_url: r.recording_url.or(artifact_recording),
            started_at: r.started_at,
            ended_at: r.ended_at,
        }
    }
}

#[async_trait]
impl VoiceVendor for VapiClient {
    async fn create_call(&self, request: VendorCallRequest) -> Result<VendorCall, VendorError> {
        debug!(
            "Creating Vapi call for {} with assistant {}",
            request.call_id, request.assistant_id
        );

        let body = CreateCallBody::from_request(&request);

        let response: CreateCallResponse = self
            .send(self.client.post(format!("{}/call", self.base_url)).json(&body))
            .await?;

        Ok(VendorCall {
            id: response.id,
            status: response.status,
        })
    }

    async fn get_call(&self, vapi_call_id: &str) -> Result<VendorCallState, VendorError> {
        let response: CallResponse = self
            .send(
                self.client
                    .get(format!("{}/call/{}", self.base_url, vapi_call_id)),
            )
            .await?;
        Ok(response.into())
    }
}
