//! Call API handlers

use super::dto::{ApiError, ApiResponse, CreateCallRequest, ListCallsQuery, SyncResponse};
use super::metrics_handler::{record_call_initiated, record_call_sync, record_dispatch_failed};
use super::organization::CurrentOrganization;
use crate::application::call::{CallDetails, CallPage, CallService, CallStats};
use crate::domain::call::Call;
use crate::domain::rate_limit::RateLimiter;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::value_objects::CallId;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::info;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub call_service: Arc<CallService>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    /// Call initiations allowed per organization per window
    pub initiate_limit: u32,
    pub rate_window: chrono::Duration,
    /// Shared secret for webhook authentication; unauthenticated when `None`
    pub webhook_secret: Option<String>,
}

type Created<T> = (StatusCode, Json<ApiResponse<T>>);

fn record_initiation<T>(result: &Result<T, DomainError>) {
    match result {
        Ok(_) => record_call_initiated(),
        Err(DomainError::Internal(_)) => record_dispatch_failed(),
        Err(_) => {}
    }
}

/// Place an outbound call
pub async fn create_call(
    State(state): State<AppState>,
    CurrentOrganization(organization_id): CurrentOrganization,
    Json(req): Json<CreateCallRequest>,
) -> Result<Created<Call>, ApiError> {
    info!(
        "API: Initiating call to {} with agent {} for organization {}",
        req.phone_number, req.agent_id, organization_id
    );

    let result = state
        .call_service
        .initiate_call(req.into_request(organization_id))
        .await;
    record_initiation(&result);
    let call = result?;

    info!("API: Initiated call {} ({})", call.id, call.status);
    Ok((StatusCode::CREATED, Json(ApiResponse::success(call))))
}

/// List the organization's calls, newest first
pub async fn list_calls(
    State(state): State<AppState>,
    CurrentOrganization(organization_id): CurrentOrganization,
    Query(query): Query<ListCallsQuery>,
) -> Result<Json<ApiResponse<CallPage>>, ApiError> {
    info!(
        "API: Listing calls for organization {} (limit: {}, offset: {})",
        organization_id, query.limit, query.offset
    );

    let filters = query.filters()?;
    let (limit, offset) = query.page();
    let page = state
        .call_service
        .list_calls(&organization_id, &filters, limit, offset)
        .await?;

    Ok(Json(ApiResponse::success(page)))
}

/// Per-status call counts
pub async fn get_call_stats(
    State(state): State<AppState>,
    CurrentOrganization(organization_id): CurrentOrganization,
) -> Result<Json<ApiResponse<CallStats>>, ApiError> {
    info!("API: Getting call statistics for organization {}", organization_id);

    let stats = state.call_service.call_stats(&organization_id).await?;
    Ok(Json(ApiResponse::success(stats)))
}

pub async fn get_call(
    State(state): State<AppState>,
    CurrentOrganization(organization_id): CurrentOrganization,
    Path(call_id): Path<CallId>,
) -> Result<Json<ApiResponse<CallDetails>>, ApiError> {
    info!("API: Getting call {}", call_id);

    let details = state
        .call_service
        .get_call_details(&call_id, &organization_id)
        .await?;
    Ok(Json(ApiResponse::success(details)))
}

/// Re-dial a failed or unanswered call as a new call
pub async fn retry_call(
    State(state): State<AppState>,
    CurrentOrganization(organization_id): CurrentOrganization,
    Path(call_id): Path<CallId>,
) -> Result<Created<Call>, ApiError> {
    info!("API: Retrying call {}", call_id);

    let result = state
        .call_service
        .retry_call(&call_id, &organization_id)
        .await;
    record_initiation(&result);
    let call = result?;

    info!("API: Retried call {} as {}", call_id, call.id);
    Ok((StatusCode::CREATED, Json(ApiResponse::success(call))))
}

/// Pull the call's current state from the voice platform
pub async fn sync_call(
    State(state): State<AppState>,
    CurrentOrganization(organization_id): CurrentOrganization,
    Path(call_id): Path<CallId>,
) -> Result<Json<ApiResponse<SyncResponse>>, ApiError> {
    info!("API: Syncing call {}", call_id);

    // Resolve within the organization first; the sync itself is unscoped
    state
        .call_service
        .get_call_details(&call_id, &organization_id)
        .await?;

    let synced = state.call_service.sync_call_from_vendor(&call_id).await;
    record_call_sync(synced);

    Ok(Json(ApiResponse::success(SyncResponse { synced })))
}
