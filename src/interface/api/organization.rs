//! Organization identity extractor
//!
//! Authentication happens upstream; by the time a request reaches us the
//! caller's organization is carried in `X-Organization-Id`.

use super::dto::ApiError;
use crate::domain::shared::value_objects::OrganizationId;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

pub const ORGANIZATION_HEADER: &str = "x-organization-id";

/// The organization every call query and write is scoped to
#[derive(Debug, Clone, Copy)]
pub struct CurrentOrganization(pub OrganizationId);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentOrganization
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(ORGANIZATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ApiError::InvalidRequest("Missing X-Organization-Id header".to_string())
            })?;

        value.trim().parse().map(CurrentOrganization).map_err(|_| {
            warn!("API: Rejected malformed organization id '{}'", value);
            ApiError::InvalidRequest("Invalid X-Organization-Id header".to_string())
        })
    }
}
