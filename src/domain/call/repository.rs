//! Call repository interface

use super::entity::Call;
use super::patch::CallPatch;
use super::value_object::{CallDirection, CallStatus};
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{CallId, CampaignId, OrganizationId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Filters for listing an organization's calls
#[derive(Debug, Clone, Default)]
pub struct CallFilters {
    pub status: Option<CallStatus>,
    pub campaign_id: Option<CampaignId>,
    pub direction: Option<CallDirection>,
}

impl CallFilters {
    pub fn matches(&self, call: &Call) -> bool {
        self.status.as_ref().map_or(true, |s| &call.status == s)
            && self.campaign_id.map_or(true, |c| call.campaign_id == Some(c))
            && self.direction.map_or(true, |d| call.direction == d)
    }
}

/// Call record store
///
/// Writes are unconditional field-level overwrites; there is no version
/// check, so concurrent patches resolve as last-write-wins per field.
/// The billing claim is the one conditional write.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CallRepository: Send + Sync {
    /// Insert a new call
    async fn create(&self, call: &Call) -> Result<()>;

    /// Find a call by internal ID, unscoped. Only for internal reconciliation.
    async fn find_by_id(&self, id: &CallId) -> Result<Option<Call>>;

    /// Find a call by the vendor's call ID
    async fn find_by_vendor_id(&self, vapi_call_id: &str) -> Result<Option<Call>>;

    /// Find a call belonging to the organization
    async fn find_for_organization(
        &self,
        id: &CallId,
        organization_id: &OrganizationId,
    ) -> Result<Option<Call>>;

    /// Find a call belonging to the organization whose status is failed or no-answer
    async fn find_retryable(
        &self,
        id: &CallId,
        organization_id: &OrganizationId,
    ) -> Result<Option<Call>>;

    /// Apply a patch; returns the updated call, or `None` if it does not exist
    async fn apply_patch(&self, id: &CallId, patch: &CallPatch) -> Result<Option<Call>>;

    /// Atomically mark the call billed. Returns `true` only for the first
    /// claim, so concurrent duplicates cannot both bill.
    async fn claim_billing(&self, id: &CallId) -> Result<bool>;

    /// List calls newest first
    async fn list(
        &self,
        organization_id: &OrganizationId,
        filters: &CallFilters,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Call>>;

    /// Count calls matching filters
    async fn count(&self, organization_id: &OrganizationId, filters: &CallFilters) -> Result<i64>;

    /// Number of calls per status string
    async fn count_by_status(&self, organization_id: &OrganizationId) -> Result<Vec<(String, i64)>>;

    /// Dispatched, non-terminal calls not updated since `updated_before`, oldest first
    async fn find_stale(&self, updated_before: DateTime<Utc>, limit: i64) -> Result<Vec<Call>>;
}
