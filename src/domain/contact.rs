//! Contacts reached by campaigns

use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{ContactId, OrganizationId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Contact status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    Pending,
    Contacted,
    Completed,
    Failed,
}

impl ContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::Pending => "pending",
            ContactStatus::Contacted => "contacted",
            ContactStatus::Completed => "completed",
            ContactStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ContactStatus::Pending),
            "contacted" => Some(ContactStatus::Contacted),
            "completed" => Some(ContactStatus::Completed),
            "failed" => Some(ContactStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    pub fn new(organization_id: OrganizationId, name: String, phone_number: String) -> Self {
        let now = Utc::now();
        Self {
            id: ContactId::new(),
            organization_id,
            name,
            phone_number,
            email: None,
            status: ContactStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn summary(&self) -> ContactSummary {
        ContactSummary {
            id: self.id,
            name: self.name.clone(),
            phone_number: self.phone_number.clone(),
            status: self.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactSummary {
    pub id: ContactId,
    pub name: String,
    pub phone_number: String,
    pub status: ContactStatus,
}

/// Contact repository trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn find_for_organization(
        &self,
        id: &ContactId,
        organization_id: &OrganizationId,
    ) -> Result<Option<Contact>>;

    /// Overwrite the contact's status
    async fn update_status(&self, id: &ContactId, status: ContactStatus) -> Result<()>;
}
