//! Rate limiting middleware for call initiation

use super::calls_handler::AppState;
use super::dto::ApiError;
use super::organization::CurrentOrganization;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::warn;

pub fn initiate_key(organization_id: &impl std::fmt::Display) -> String {
    format!("initiate:{}", organization_id)
}

/// Count the request against the organization's initiation budget.
/// Rejects with 429 and `Retry-After` once the window is exhausted.
pub async fn limit_call_initiation(
    State(state): State<AppState>,
    CurrentOrganization(organization_id): CurrentOrganization,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let decision = state
        .rate_limiter
        .check(
            &initiate_key(&organization_id),
            state.initiate_limit,
            state.rate_window,
        )
        .await?;

    if !decision.allowed {
        let retry_after_secs = (decision.reset_at - Utc::now()).num_seconds();
        warn!(
            "API: Rate limit reached for organization {}, retry in {}s",
            organization_id, retry_after_secs
        );
        return Err(ApiError::RateLimited { retry_after_secs });
    }

    Ok(next.run(request).await)
}
