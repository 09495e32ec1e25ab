//! HTTP API

pub mod calls_handler;
pub mod dto;
pub mod metrics_handler;
pub mod organization;
pub mod rate_limit;
pub mod router;
pub mod webhook_handler;

pub use calls_handler::AppState;
pub use dto::{ApiError, ApiResponse};
pub use metrics_handler::init_metrics;
pub use organization::{CurrentOrganization, ORGANIZATION_HEADER};
pub use router::build_router;
