//! PostgreSQL implementations of the organization and phone number repositories

use super::database::storage_error;
use crate::domain::organization::{Organization, OrganizationRepository, SubscriptionPlan};
use crate::domain::phone_number::{PhoneNumber, PhoneNumberRepository};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{OrganizationId, PhoneNumberId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(FromRow)]
struct OrganizationRow {
    id: Uuid,
    name: String,
    plan: String,
    minutes_limit: Option<i64>,
    seconds_used_this_month: i64,
    trial_ends_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrganizationRow> for Organization {
    fn from(r: OrganizationRow) -> Self {
        let plan = SubscriptionPlan::parse(&r.plan).unwrap_or_else(|| {
            warn!("Unknown plan '{}' for organization {}, treating as trial", r.plan, r.id);
            SubscriptionPlan::Trial
        });
        Organization {
            id: OrganizationId::from_uuid(r.id),
            name: r.name,
            plan,
            minutes_limit: r.minutes_limit,
            seconds_used_this_month: r.seconds_used_this_month,
            trial_ends_at: r.trial_ends_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

pub struct PgOrganizationRepository {
    pool: PgPool,
}

impl PgOrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrganizationRepository for PgOrganizationRepository {
    async fn find_by_id(&self, id: &OrganizationId) -> Result<Option<Organization>> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            r#"
            SELECT id, name, plan, minutes_limit, seconds_used_this_month,
                   trial_ends_at, created_at, updated_at
            FROM organizations
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error("Failed to get organization"))?;

        Ok(row.map(Into::into))
    }

    async fn add_usage_seconds(&self, id: &OrganizationId, seconds: i64) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE organizations
            SET seconds_used_this_month = seconds_used_this_month + $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(seconds)
        .execute(&self.pool)
        .await
        .map_err(storage_error("Failed to record usage"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound("Organization not found".to_string()));
        }
        debug!("Added {}s usage to organization {}", seconds, id);
        Ok(())
    }
}

#[derive(FromRow)]
struct PhoneNumberRow {
    id: Uuid,
    organization_id: Uuid,
    number: String,
    vapi_phone_number_id: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<PhoneNumberRow> for PhoneNumber {
    fn from(r: PhoneNumberRow) -> Self {
        PhoneNumber {
            id: PhoneNumberId::from_uuid(r.id),
            organization_id: OrganizationId::from_uuid(r.organization_id),
            number: r.number,
            vapi_phone_number_id: r.vapi_phone_number_id,
            is_active: r.is_active,
            created_at: r.created_at,
        }
    }
}

pub struct PgPhoneNumberRepository {
    pool: PgPool,
}

impl PgPhoneNumberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PhoneNumberRepository for PgPhoneNumberRepository {
    async fn find_active_for_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<PhoneNumber>> {
        let row = sqlx::query_as::<_, PhoneNumberRow>(
            r#"
            SELECT id, organization_id, number, vapi_phone_number_id, is_active, created_at
            FROM phone_numbers
            WHERE organization_id = $1 AND is_active
            ORDER BY created_at ASC, id ASC
            LIMIT 1
            "#,
        )
        .bind(organization_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error("Failed to get phone number"))?;

        Ok(row.map(Into::into))
    }
}
