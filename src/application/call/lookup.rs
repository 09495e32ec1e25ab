//! Organization-scoped call queries and retry

use super::{
    CallDetails, CallPage, CallService, CallStats, InitiateCallRequest, CALL_NOT_FOUND,
    CALL_NOT_RETRYABLE, RETRY_MISSING_DATA,
};
use crate::domain::call::{Call, CallFilters};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{CallId, OrganizationId};
use std::collections::BTreeMap;
use tracing::info;

impl CallService {
    /// A call with its agent, campaign and contact summaries.
    ///
    /// A call of another organization is reported exactly like a missing one.
    pub async fn get_call_details(
        &self,
        call_id: &CallId,
        organization_id: &OrganizationId,
    ) -> Result<CallDetails> {
        let call = self
            .repos
            .calls
            .find_for_organization(call_id, organization_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(CALL_NOT_FOUND.to_string()))?;

        let agent = match &call.agent_id {
            Some(id) => self
                .repos
                .agents
                .find_for_organization(id, organization_id)
                .await?
                .map(|a| a.summary()),
            None => None,
        };
        let campaign = match &call.campaign_id {
            Some(id) => self
                .repos
                .campaigns
                .find_for_organization(id, organization_id)
                .await?
                .map(|c| c.summary()),
            None => None,
        };
        let contact = match &call.contact_id {
            Some(id) => self
                .repos
                .contacts
                .find_for_organization(id, organization_id)
                .await?
                .map(|c| c.summary()),
            None => None,
        };

        Ok(CallDetails {
            call,
            agent,
            campaign,
            contact,
        })
    }

    /// Place a fresh call with the same agent, number, contact and campaign
    /// as a failed or unanswered one. The original record is untouched.
    pub async fn retry_call(
        &self,
        call_id: &CallId,
        organization_id: &OrganizationId,
    ) -> Result<Call> {
        let original = self
            .repos
            .calls
            .find_retryable(call_id, organization_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(CALL_NOT_RETRYABLE.to_string()))?;

        let (Some(agent_id), Some(phone_number)) = (original.agent_id, original.to_number.clone())
        else {
            return Err(DomainError::BadRequest(RETRY_MISSING_DATA.to_string()));
        };

        info!("Retrying call {} ({})", original.id, original.status);
        self.initiate_call(InitiateCallRequest {
            organization_id: *organization_id,
            agent_id,
            phone_number,
            contact_id: original.contact_id,
            campaign_id: original.campaign_id,
        })
        .await
    }

    /// Newest-first page of the organization's calls
    pub async fn list_calls(
        &self,
        organization_id: &OrganizationId,
        filters: &CallFilters,
        limit: i64,
        offset: i64,
    ) -> Result<CallPage> {
        let calls = self
            .repos
            .calls
            .list(organization_id, filters, limit, offset)
            .await?;
        let total = self.repos.calls.count(organization_id, filters).await?;
        Ok(CallPage {
            calls,
            total,
            limit,
            offset,
        })
    }

    pub async fn call_stats(&self, organization_id: &OrganizationId) -> Result<CallStats> {
        let by_status: BTreeMap<String, i64> = self
            .repos
            .calls
            .count_by_status(organization_id)
            .await?
            .into_iter()
            .collect();
        Ok(CallStats {
            total: by_status.values().sum(),
            by_status,
        })
    }
}
