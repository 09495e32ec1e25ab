//! Call usage billing

use crate::domain::organization::OrganizationRepository;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{CallId, OrganizationId};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Records billable call time
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsageRecorder: Send + Sync {
    async fn record_call_usage(
        &self,
        organization_id: &OrganizationId,
        duration_seconds: i32,
        call_id: &CallId,
    ) -> Result<()>;
}

/// Accrues call seconds onto the organization's monthly usage counter
pub struct OrganizationUsageRecorder {
    organizations: Arc<dyn OrganizationRepository>,
}

impl OrganizationUsageRecorder {
    pub fn new(organizations: Arc<dyn OrganizationRepository>) -> Self {
        Self { organizations }
    }
}

#[async_trait]
impl UsageRecorder for OrganizationUsageRecorder {
    async fn record_call_usage(
        &self,
        organization_id: &OrganizationId,
        duration_seconds: i32,
        call_id: &CallId,
    ) -> Result<()> {
        let seconds = i64::from(duration_seconds.max(0));
        self.organizations
            .add_usage_seconds(organization_id, seconds)
            .await?;
        info!(
            "Recorded {}s of usage for organization {} (call {})",
            seconds, organization_id, call_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::organization::MockOrganizationRepository;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_records_seconds_on_organization() {
        let org_id = OrganizationId::new();
        let mut repo = MockOrganizationRepository::new();
        repo.expect_add_usage_seconds()
            .with(eq(org_id), eq(95i64))
            .times(1)
            .returning(|_, _| Ok(()));

        let recorder = OrganizationUsageRecorder::new(Arc::new(repo));
        recorder
            .record_call_usage(&org_id, 95, &CallId::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_negative_duration_clamped() {
        let mut repo = MockOrganizationRepository::new();
        repo.expect_add_usage_seconds()
            .withf(|_, seconds| *seconds == 0)
            .times(1)
            .returning(|_, _| Ok(()));

        let recorder = OrganizationUsageRecorder::new(Arc::new(repo));
        recorder
            .record_call_usage(&OrganizationId::new(), -5, &CallId::new())
            .await
            .unwrap();
    }
}
