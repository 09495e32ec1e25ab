//! Phone numbers owned by an organization

use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{OrganizationId, PhoneNumberId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub id: PhoneNumberId,
    pub organization_id: OrganizationId,
    /// E.164 number
    pub number: String,
    /// Number's identity on the voice platform
    pub vapi_phone_number_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl PhoneNumber {
    pub fn new(organization_id: OrganizationId, number: String) -> Self {
        Self {
            id: PhoneNumberId::new(),
            organization_id,
            number,
            vapi_phone_number_id: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PhoneNumberRepository: Send + Sync {
    /// First active number of the organization, by creation time.
    ///
    /// No load balancing across several active numbers.
    async fn find_active_for_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<PhoneNumber>>;
}
