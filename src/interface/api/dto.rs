//! Request/response DTOs and the API error type

use crate::application::call::InitiateCallRequest;
use crate::domain::call::{CallDirection, CallFilters, CallStatus};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::value_objects::{AgentId, CampaignId, ContactId, OrganizationId};
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Maximum page size for list endpoints
pub const MAX_LIMIT: i64 = 200;

/// Generic API response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiErrorBody {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Error returned from handlers and middleware
#[derive(Debug)]
pub enum ApiError {
    Domain(DomainError),
    /// Malformed request outside the call service's own validation
    InvalidRequest(String),
    Unauthorized,
    RateLimited { retry_after_secs: i64 },
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        ApiError::Domain(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Domain(e) => {
                let status = match &e {
                    DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
                    DomainError::BadRequest(_) => StatusCode::BAD_REQUEST,
                    DomainError::NotFound(_) => StatusCode::NOT_FOUND,
                    DomainError::Internal(_) | DomainError::Storage(_) => {
                        error!("API: Request failed: {}", e);
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                let body = ApiResponse::<()>::error(e.code().as_str(), e.public_message());
                (status, Json(body)).into_response()
            }
            ApiError::InvalidRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<()>::error("BAD_REQUEST", message)),
            )
                .into_response(),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::<()>::error(
                    "UNAUTHORIZED",
                    "Invalid webhook credentials",
                )),
            )
                .into_response(),
            ApiError::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after_secs.max(1).to_string())],
                Json(ApiResponse::<()>::error(
                    "TOO_MANY_REQUESTS",
                    "Too many requests. Please try again later.",
                )),
            )
                .into_response(),
        }
    }
}

/// Body of `POST /calls`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCallRequest {
    pub agent_id: AgentId,
    pub phone_number: String,
    pub contact_id: Option<ContactId>,
    pub campaign_id: Option<CampaignId>,
}

impl CreateCallRequest {
    pub fn into_request(self, organization_id: OrganizationId) -> InitiateCallRequest {
        InitiateCallRequest {
            organization_id,
            agent_id: self.agent_id,
            phone_number: self.phone_number,
            contact_id: self.contact_id,
            campaign_id: self.campaign_id,
        }
    }
}

/// Query parameters for listing calls
#[derive(Debug, Deserialize)]
pub struct ListCallsQuery {
    pub status: Option<String>,
    pub campaign_id: Option<CampaignId>,
    pub direction: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

impl ListCallsQuery {
    pub fn filters(&self) -> Result<CallFilters, ApiError> {
        let direction = match self.direction.as_deref() {
            Some(d) => Some(CallDirection::parse(d).ok_or_else(|| {
                ApiError::InvalidRequest(format!("Invalid direction: {}", d))
            })?),
            None => None,
        };
        Ok(CallFilters {
            status: self.status.as_deref().map(CallStatus::parse),
            campaign_id: self.campaign_id,
            direction,
        })
    }

    /// Limit and offset clamped to sane bounds
    pub fn page(&self) -> (i64, i64) {
        (self.limit.clamp(1, MAX_LIMIT), self.offset.max(0))
    }
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub synced: bool,
}

/// Acknowledgement returned to the voice platform
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self { received: true }
    }
}
