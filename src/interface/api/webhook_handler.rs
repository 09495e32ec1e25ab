//! Voice platform webhook endpoint

use super::calls_handler::AppState;
use super::dto::{ApiError, WebhookAck};
use super::metrics_handler::record_webhook;
use crate::infrastructure::vapi::{verify_request, VapiWebhook, SECRET_HEADER, SIGNATURE_HEADER};
use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use tracing::{debug, info, warn};

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Receive a Vapi server message.
///
/// Anything we can't use is still acknowledged so the platform doesn't
/// retry it. Only a store failure is reported back as an error.
pub async fn vapi_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    if let Some(secret) = &state.webhook_secret {
        let verified = verify_request(
            secret,
            header(&headers, SECRET_HEADER),
            header(&headers, SIGNATURE_HEADER),
            &body,
        );
        if !verified {
            warn!("API: Rejected webhook with invalid credentials");
            record_webhook("unauthorized");
            return Err(ApiError::Unauthorized);
        }
    }

    let message = match serde_json::from_slice::<VapiWebhook>(&body) {
        Ok(webhook) => webhook.message,
        Err(e) => {
            warn!("API: Ignoring unparseable webhook: {}", e);
            record_webhook("ignored");
            return Ok(Json(WebhookAck::received()));
        }
    };

    let kind = message.kind.clone();
    let Some(event) = message.into_event() else {
        debug!("API: Ignoring webhook of type {}", kind);
        record_webhook("ignored");
        return Ok(Json(WebhookAck::received()));
    };

    info!(
        "API: Webhook {} for vendor call {} ({})",
        kind, event.call_id, event.status
    );

    match state.call_service.handle_call_webhook(event).await {
        Ok(Some(_)) => record_webhook("applied"),
        Ok(None) => record_webhook("unknown_call"),
        Err(e) => {
            record_webhook("error");
            return Err(e.into());
        }
    }

    Ok(Json(WebhookAck::received()))
}
