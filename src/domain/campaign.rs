//! Outbound calling campaigns (read-only here)

use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{CampaignId, OrganizationId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub organization_id: OrganizationId,
    pub name: String,
    /// Free-form brief handed to the agent as campaign context
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    pub fn new(organization_id: OrganizationId, name: String) -> Self {
        Self {
            id: CampaignId::new(),
            organization_id,
            name,
            description: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn summary(&self) -> CampaignSummary {
        CampaignSummary {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub id: CampaignId,
    pub name: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    async fn find_for_organization(
        &self,
        id: &CampaignId,
        organization_id: &OrganizationId,
    ) -> Result<Option<Campaign>>;
}
