//! API Router configuration

use super::calls_handler::{
    create_call, get_call, get_call_stats, list_calls, retry_call, sync_call, AppState,
};
use super::dto::ApiResponse;
use super::metrics_handler::{metrics_handler, track_http_requests};
use super::rate_limit::limit_call_initiation;
use super::webhook_handler::vapi_webhook;
use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Liveness check
pub async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("OK"))
}

/// Build the API router
pub fn build_router(state: AppState, prometheus_handle: PrometheusHandle) -> Router {
    // Health check route (no organization required)
    let health_routes = Router::new().route("/health", get(health_check));

    // Call routes; anything that places a call shares the initiation budget
    let initiation_limit = middleware::from_fn_with_state(state.clone(), limit_call_initiation);
    let call_routes = Router::new()
        .route("/calls", post(create_call).route_layer(initiation_limit.clone()))
        .route("/calls", get(list_calls))
        .route("/calls/stats", get(get_call_stats))
        .route("/calls/:id", get(get_call))
        .route("/calls/:id/retry", post(retry_call).route_layer(initiation_limit))
        .route("/calls/:id/sync", post(sync_call));

    // Voice platform callbacks
    let webhook_routes = Router::new().route("/webhooks/vapi", post(vapi_webhook));

    // Metrics route (separate state)
    let metrics_routes = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(prometheus_handle);

    // Combine routes with state
    Router::new()
        .merge(health_routes)
        .merge(call_routes)
        .merge(webhook_routes)
        .with_state(state)
        .merge(metrics_routes)
        .route_layer(middleware::from_fn(track_http_requests))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
