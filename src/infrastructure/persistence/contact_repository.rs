//! PostgreSQL implementations of the contact and campaign repositories

use super::database::storage_error;
use crate::domain::campaign::{Campaign, CampaignRepository};
use crate::domain::contact::{Contact, ContactRepository, ContactStatus};
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{CampaignId, ContactId, OrganizationId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

#[derive(FromRow)]
struct ContactRow {
    id: Uuid,
    organization_id: Uuid,
    name: String,
    phone_number: String,
    email: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ContactRow> for Contact {
    fn from(r: ContactRow) -> Self {
        Contact {
            id: ContactId::from_uuid(r.id),
            organization_id: OrganizationId::from_uuid(r.organization_id),
            name: r.name,
            phone_number: r.phone_number,
            email: r.email,
            status: ContactStatus::parse(&r.status).unwrap_or(ContactStatus::Pending),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

pub struct PgContactRepository {
    pool: PgPool,
}

impl PgContactRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactRepository for PgContactRepository {
    async fn find_for_organization(
        &self,
        id: &ContactId,
        organization_id: &OrganizationId,
    ) -> Result<Option<Contact>> {
        let row = sqlx::query_as::<_, ContactRow>(
            r#"
            SELECT id, organization_id, name, phone_number, email, status,
                   created_at, updated_at
            FROM contacts
            WHERE id = $1 AND organization_id = $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(organization_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error("Failed to get contact"))?;

        Ok(row.map(Into::into))
    }

    async fn update_status(&self, id: &ContactId, status: ContactStatus) -> Result<()> {
        let result = sqlx::query(
            "UPDATE contacts SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(storage_error("Failed to update contact status"))?;

        if result.rows_affected() == 0 {
            debug!("Contact {} not found for status update", id);
        }
        Ok(())
    }
}

#[derive(FromRow)]
struct CampaignRow {
    id: Uuid,
    organization_id: Uuid,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<CampaignRow> for Campaign {
    fn from(r: CampaignRow) -> Self {
        Campaign {
            id: CampaignId::from_uuid(r.id),
            organization_id: OrganizationId::from_uuid(r.organization_id),
            name: r.name,
            description: r.description,
            created_at: r.created_at,
        }
    }
}

pub struct PgCampaignRepository {
    pool: PgPool,
}

impl PgCampaignRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CampaignRepository for PgCampaignRepository {
    async fn find_for_organization(
        &self,
        id: &CampaignId,
        organization_id: &OrganizationId,
    ) -> Result<Option<Campaign>> {
        let row = sqlx::query_as::<_, CampaignRow>(
            r#"
            SELECT id, organization_id, name, description, created_at
            FROM campaigns
            WHERE id = $1 AND organization_id = $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(organization_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error("Failed to get campaign"))?;

        Ok(row.map(Into::into))
    }
}
