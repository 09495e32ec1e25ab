//! Pre-call guardrails: trial status and minutes allowance
//!
//! Both checks are read-only. They run before any call record exists.

use crate::domain::organization::{Organization, OrganizationRepository};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::OrganizationId;
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Reason used when a denial carries none
pub const DEFAULT_LIMIT_REASON: &str = "Minutes limit reached";

/// Outcome of the minutes check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MinutesCheck {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl MinutesCheck {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn denied(reason: Option<String>) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }

    /// Denial message for the caller
    pub fn denial_message(&self) -> String {
        self.reason
            .clone()
            .unwrap_or_else(|| DEFAULT_LIMIT_REASON.to_string())
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Guardrails: Send + Sync {
    /// Fails when the organization's trial has lapsed
    async fn ensure_trial_expiry(&self, organization_id: &OrganizationId) -> Result<()>;

    /// Whether the organization has minutes left this month
    async fn check_minutes_limit(&self, organization_id: &OrganizationId) -> Result<MinutesCheck>;
}

/// Guardrails backed by the organization's plan and usage counter
pub struct PlanGuardrails {
    organizations: Arc<dyn OrganizationRepository>,
}

impl PlanGuardrails {
    pub fn new(organizations: Arc<dyn OrganizationRepository>) -> Self {
        Self { organizations }
    }

    async fn organization(&self, organization_id: &OrganizationId) -> Result<Organization> {
        self.organizations
            .find_by_id(organization_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("Organization not found".to_string()))
    }
}

#[async_trait]
impl Guardrails for PlanGuardrails {
    async fn ensure_trial_expiry(&self, organization_id: &OrganizationId) -> Result<()> {
        let org = self.organization(organization_id).await?;
        if org.is_trial_expired(Utc::now()) {
            debug!("Trial expired for organization {}", organization_id);
            return Err(DomainError::Forbidden(
                "Your free trial has expired. Please upgrade to continue placing calls."
                    .to_string(),
            ));
        }
        Ok(())
    }

    async fn check_minutes_limit(&self, organization_id: &OrganizationId) -> Result<MinutesCheck> {
        let org = self.organization(organization_id).await?;
        let Some(limit) = org.minutes_allowance() else {
            return Ok(MinutesCheck::allowed());
        };

        let used = org.minutes_used();
        if used >= limit {
            debug!(
                "Organization {} is out of minutes ({}/{})",
                organization_id, used, limit
            );
            return Ok(MinutesCheck::denied(Some(format!(
                "Monthly minutes limit reached ({}/{})",
                used, limit
            ))));
        }

        Ok(MinutesCheck::allowed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::organization::{MockOrganizationRepository, SubscriptionPlan};
    use chrono::Duration;

    fn guardrails_for(org: Option<Organization>) -> PlanGuardrails {
        let mut repo = MockOrganizationRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(org.clone()));
        PlanGuardrails::new(Arc::new(repo))
    }

    #[tokio::test]
    async fn test_trial_active_passes() {
        let org = Organization::new("Acme".into());
        let id = org.id;
        let guardrails = guardrails_for(Some(org));
        assert!(guardrails.ensure_trial_expiry(&id).await.is_ok());
    }

    #[tokio::test]
    async fn test_trial_expired_is_forbidden() {
        let mut org = Organization::new("Acme".into());
        org.trial_ends_at = Some(Utc::now() - Duration::hours(1));
        let id = org.id;
        let guardrails = guardrails_for(Some(org));

        let err = guardrails.ensure_trial_expiry(&id).await.unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_unknown_organization() {
        let guardrails = guardrails_for(None);
        let err = guardrails
            .check_minutes_limit(&OrganizationId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_minutes_limit() {
        let mut org = Organization::new("Acme".into()).with_plan(SubscriptionPlan::Starter);
        org.minutes_limit = Some(10);
        org.seconds_used_this_month = 9 * 60;
        let id = org.id;

        let check = guardrails_for(Some(org.clone())).check_minutes_limit(&id).await.unwrap();
        assert!(check.allowed);

        org.seconds_used_this_month = 10 * 60;
        let check = guardrails_for(Some(org)).check_minutes_limit(&id).await.unwrap();
        assert!(!check.allowed);
        assert_eq!(check.denial_message(), "Monthly minutes limit reached (10/10)");
    }

    #[tokio::test]
    async fn test_unlimited_plan_never_blocks() {
        let mut org = Organization::new("Acme".into()).with_plan(SubscriptionPlan::Enterprise);
        org.seconds_used_this_month = 10_000_000;
        let id = org.id;
        let check = guardrails_for(Some(org)).check_minutes_limit(&id).await.unwrap();
        assert!(check.allowed);
    }

    #[test]
    fn test_default_denial_message() {
        assert_eq!(MinutesCheck::denied(None).denial_message(), DEFAULT_LIMIT_REASON);
        assert_eq!(
            MinutesCheck::denied(Some("Custom".into())).denial_message(),
            "Custom"
        );
    }
}
