//! Vapi server message envelope and webhook authentication

use crate::application::call::CallWebhookEvent;
use crate::domain::call::CallStatus;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

pub const SECRET_HEADER: &str = "x-vapi-secret";
pub const SIGNATURE_HEADER: &str = "x-vapi-signature";

/// Ended reasons that mean nobody picked up
const NO_ANSWER_REASONS: [&str; 3] = ["customer-did-not-answer", "customer-busy", "voicemail"];

#[derive(Debug, Clone, Deserialize)]
pub struct VapiWebhook {
    pub message: VapiMessage,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VapiMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub call: Option<VapiCallRef>,
    pub status: Option<String>,
    pub ended_reason: Option<String>,
    pub duration_seconds: Option<f64>,
    pub transcript: Option<String>,
    pub recording_url: Option<String>,
    pub summary: Option<String>,
    pub analysis: Option<VapiAnalysis>,
    pub artifact: Option<VapiArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VapiCallRef {
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VapiAnalysis {
    pub summary: Option<String>,
    pub sentiment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VapiArtifact {
    pub transcript: Option<String>,
    pub recording_url: Option<String>,
}

/// Call status implied by an end-of-call report
pub fn status_for_ended_reason(reason: Option<&str>) -> CallStatus {
    match reason {
        Some(r) if NO_ANSWER_REASONS.contains(&r) => CallStatus::NoAnswer,
        Some(r) if r.contains("error") || r.contains("failed") => CallStatus::Failed,
        _ => CallStatus::Completed,
    }
}

impl VapiMessage {
    /// Normalize into a status event. `None` for message types that carry
    /// no call status, or that don't name a call.
    pub fn into_event(self) -> Option<CallWebhookEvent> {
        let call_id = self.call.as_ref()?.id.clone();
        let status = match self.kind.as_str() {
            "status-update" => CallStatus::parse(self.status.as_deref()?),
            "end-of-call-report" => status_for_ended_reason(self.ended_reason.as_deref()),
            _ => return None,
        };

        let analysis = self.analysis.unwrap_or_default();
        let artifact = self.artifact.unwrap_or_default();

        Some(CallWebhookEvent {
            call_id,
            status,
            transcript: self.transcript.or(artifact.transcript),
            recording_url: self.recording_url.or(artifact.recording_url),
            summary: self.summary.or(analysis.summary),
            sentiment: analysis.sentiment,
            duration_seconds: self.duration_seconds.map(|d| d.round() as i32),
        })
    }
}

/// Check a webhook against the shared secret, either sent verbatim or as a
/// hex HMAC-SHA256 of the raw body.
pub fn verify_request(
    secret: &str,
    secret_header: Option<&str>,
    signature_header: Option<&str>,
    body: &[u8],
) -> bool {
    if let Some(provided) = secret_header {
        if constant_time_eq(provided.as_bytes(), secret.as_bytes()) {
            return true;
        }
    }

    let Some(signature) = signature_header.and_then(|s| hex::decode(s.trim()).ok()) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> VapiMessage {
        serde_json::from_value::<VapiWebhook>(value).unwrap().message
    }

    #[test]
    fn test_status_update() {
        let event = parse(json!({
            "message": {
                "type": "status-update",
                "status": "in-progress",
                "call": { "id": "vapi-1" }
            }
        }))
        .into_event()
        .unwrap();

        assert_eq!(event.call_id, "vapi-1");
        assert_eq!(event.status, CallStatus::InProgress);
        assert!(event.duration_seconds.is_none());
    }

    #[test]
    fn test_end_of_call_report() {
        let event = parse(json!({
            "message": {
                "type": "end-of-call-report",
                "endedReason": "customer-ended-call",
                "durationSeconds": 59.6,
                "call": { "id": "vapi-1" },
                "analysis": { "summary": "Booked a cleaning", "sentiment": "positive" },
                "artifact": {
                    "transcript": "AI: Hi there",
                    "recordingUrl": "https://storage.vapi.ai/1.wav"
                }
            }
        }))
        .into_event()
        .unwrap();

        assert_eq!(event.status, CallStatus::Completed);
        assert_eq!(event.duration_seconds, Some(60));
        assert_eq!(event.summary.as_deref(), Some("Booked a cleaning"));
        assert_eq!(event.sentiment.as_deref(), Some("positive"));
        assert_eq!(event.transcript.as_deref(), Some("AI: Hi there"));
        assert_eq!(
            event.recording_url.as_deref(),
            Some("https://storage.vapi.ai/1.wav")
        );
    }

    #[test]
    fn test_ended_reason_mapping() {
        assert_eq!(
            status_for_ended_reason(Some("customer-did-not-answer")),
            CallStatus::NoAnswer
        );
        assert_eq!(status_for_ended_reason(Some("customer-busy")), CallStatus::NoAnswer);
        assert_eq!(status_for_ended_reason(Some("voicemail")), CallStatus::NoAnswer);
        assert_eq!(
            status_for_ended_reason(Some("pipeline-error-openai-llm-failed")),
            CallStatus::Failed
        );
        assert_eq!(
            status_for_ended_reason(Some("twilio-failed-to-connect-call")),
            CallStatus::Failed
        );
        assert_eq!(
            status_for_ended_reason(Some("assistant-ended-call")),
            CallStatus::Completed
        );
        assert_eq!(status_for_ended_reason(None), CallStatus::Completed);
    }

    #[test]
    fn test_ignored_messages() {
        let transcript = parse(json!({
            "message": { "type": "transcript", "call": { "id": "vapi-1" } }
        }));
        assert!(transcript.into_event().is_none());

        let no_call = parse(json!({
            "message": { "type": "status-update", "status": "ringing" }
        }));
        assert!(no_call.into_event().is_none());

        let no_status = parse(json!({
            "message": { "type": "status-update", "call": { "id": "vapi-1" } }
        }));
        assert!(no_status.into_event().is_none());
    }

    #[test]
    fn test_verify_secret_header() {
        assert!(verify_request("s3cret", Some("s3cret"), None, b"{}"));
        assert!(!verify_request("s3cret", Some("wrong"), None, b"{}"));
        assert!(!verify_request("s3cret", None, None, b"{}"));
    }

    #[test]
    fn test_verify_signature() {
        let body = br#"{"message":{"type":"status-update"}}"#;
        let mut mac = Hmac::<Sha256>::new_from_slice(b"s3cret").unwrap();
        mac.update(body);
        let signature = hex::encode(mac.finalize().into_bytes());

        assert!(verify_request("s3cret", None, Some(&signature), body));
        assert!(!verify_request("s3cret", None, Some(&signature), b"tampered"));
        assert!(!verify_request("s3cret", None, Some("not-hex"), body));
    }
}
