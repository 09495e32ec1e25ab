//! PostgreSQL implementation of CallRepository

use super::database::storage_error;
use crate::domain::call::{
    Call, CallDirection, CallFilters, CallPatch, CallRepository, CallStatus, TERMINAL_STATUSES,
};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{
    AgentId, CallId, CampaignId, ContactId, OrganizationId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

const CALL_COLUMNS: &str = r#"
    id, organization_id, agent_id, contact_id, campaign_id,
    direction, status, to_number, from_number, vapi_call_id,
    transcript, recording_url, summary, sentiment, duration_seconds,
    started_at, ended_at, billed_at, created_at, updated_at
"#;

#[derive(FromRow)]
struct CallRow {
    id: Uuid,
    organization_id: Uuid,
    agent_id: Option<Uuid>,
    contact_id: Option<Uuid>,
    campaign_id: Option<Uuid>,
    direction: String,
    status: String,
    to_number: Option<String>,
    from_number: Option<String>,
    vapi_call_id: Option<String>,
    transcript: Option<String>,
    recording_url: Option<String>,
    summary: Option<String>,
    sentiment: Option<String>,
    duration_seconds: Option<i32>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    billed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CallRow> for Call {
    fn from(r: CallRow) -> Self {
        Call {
            id: CallId::from_uuid(r.id),
            organization_id: OrganizationId::from_uuid(r.organization_id),
            agent_id: r.agent_id.map(AgentId::from_uuid),
            contact_id: r.contact_id.map(ContactId::from_uuid),
            campaign_id: r.campaign_id.map(CampaignId::from_uuid),
            direction: CallDirection::parse(&r.direction).unwrap_or(CallDirection::Outbound),
            status: CallStatus::parse(&r.status),
            to_number: r.to_number,
            from_number: r.from_number,
            vapi_call_id: r.vapi_call_id,
            transcript: r.transcript,
            recording_url: r.recording_url,
            summary: r.summary,
            sentiment: r.sentiment,
            duration_seconds: r.duration_seconds,
            started_at: r.started_at,
            ended_at: r.ended_at,
            billed_at: r.billed_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Map a unique violation on `vapi_call_id` to a readable storage error
fn write_error(context: &'static str) -> impl Fn(sqlx::Error) -> DomainError {
    move |e| {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return DomainError::Storage(format!("{}: duplicate vapi_call_id", context));
            }
        }
        storage_error(context)(e)
    }
}

pub struct PgCallRepository {
    pool: PgPool,
}

impl PgCallRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CallRepository for PgCallRepository {
    async fn create(&self, call: &Call) -> Result<()> {
        debug!("Creating call {}", call.id);

        sqlx::query(
            r#"
            INSERT INTO calls (
                id, organization_id, agent_id, contact_id, campaign_id,
                direction, status, to_number, from_number, vapi_call_id,
                transcript, recording_url, summary, sentiment, duration_seconds,
                started_at, ended_at, billed_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            "#,
        )
        .bind(call.id.as_uuid())
        .bind(call.organization_id.as_uuid())
        .bind(call.agent_id.map(|id| id.as_uuid()))
        .bind(call.contact_id.map(|id| id.as_uuid()))
        .bind(call.campaign_id.map(|id| id.as_uuid()))
        .bind(call.direction.as_str())
        .bind(call.status.as_str())
        .bind(call.to_number.as_deref())
        .bind(call.from_number.as_deref())
        .bind(call.vapi_call_id.as_deref())
        .bind(call.transcript.as_deref())
        .bind(call.recording_url.as_deref())
        .bind(call.summary.as_deref())
        .bind(call.sentiment.as_deref())
        .bind(call.duration_seconds)
        .bind(call.started_at)
        .bind(call.ended_at)
        .bind(call.billed_at)
        .bind(call.created_at)
        .bind(call.updated_at)
        .execute(&self.pool)
        .await
        .map_err(write_error("Failed to create call"))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &CallId) -> Result<Option<Call>> {
        let row = sqlx::query_as::<_, CallRow>(&format!(
            "SELECT {} FROM calls WHERE id = $1",
            CALL_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error("Failed to get call"))?;

        Ok(row.map(Into::into))
    }

    async fn find_by_vendor_id(&self, vapi_call_id: &str) -> Result<Option<Call>> {
        let row = sqlx::query_as::<_, CallRow>(&format!(
            "SELECT {} FROM calls WHERE vapi_call_id = $1",
            CALL_COLUMNS
        ))
        .bind(vapi_call_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error("Failed to get call by vapi_call_id"))?;

        Ok(row.map(Into::into))
    }

    async fn find_for_organization(
        &self,
        id: &CallId,
        organization_id: &OrganizationId,
    ) -> Result<Option<Call>> {
        let row = sqlx::query_as::<_, CallRow>(&format!(
            "SELECT {} FROM calls WHERE id = $1 AND organization_id = $2",
            CALL_COLUMNS
        ))
        .bind(id.as_uuid())
        .bind(organization_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error("Failed to get call"))?;

        Ok(row.map(Into::into))
    }

    async fn find_retryable(
        &self,
        id: &CallId,
        organization_id: &OrganizationId,
    ) -> Result<Option<Call>> {
        let row = sqlx::query_as::<_, CallRow>(&format!(
            "SELECT {} FROM calls
             WHERE id = $1 AND organization_id = $2 AND status IN ('failed', 'no-answer')",
            CALL_COLUMNS
        ))
        .bind(id.as_uuid())
        .bind(organization_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error("Failed to get retryable call"))?;

        Ok(row.map(Into::into))
    }

    async fn apply_patch(&self, id: &CallId, patch: &CallPatch) -> Result<Option<Call>> {
        debug!("Patching call {}", id);

        let row = sqlx::query_as::<_, CallRow>(&format!(
            r#"
            UPDATE calls
            SET status = COALESCE($2, status),
                vapi_call_id = COALESCE($3, vapi_call_id),
                transcript = COALESCE($4, transcript),
                recording_url = COALESCE($5, recording_url),
                summary = COALESCE($6, summary),
                sentiment = COALESCE($7, sentiment),
                duration_seconds = COALESCE($8, duration_seconds),
                started_at = COALESCE($9, started_at),
                ended_at = COALESCE($10, ended_at),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CALL_COLUMNS
        ))
        .bind(id.as_uuid())
        .bind(patch.status.as_ref().map(|s| s.as_str().to_string()))
        .bind(patch.vapi_call_id.as_deref())
        .bind(patch.transcript.as_deref())
        .bind(patch.recording_url.as_deref())
        .bind(patch.summary.as_deref())
        .bind(patch.sentiment.as_deref())
        .bind(patch.duration_seconds)
        .bind(patch.started_at)
        .bind(patch.ended_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(write_error("Failed to update call"))?;

        Ok(row.map(Into::into))
    }

    async fn claim_billing(&self, id: &CallId) -> Result<bool> {
        let claimed = sqlx::query_scalar::<_, Uuid>(
            "UPDATE calls SET billed_at = NOW() WHERE id = $1 AND billed_at IS NULL RETURNING id",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error("Failed to claim call billing"))?;

        Ok(claimed.is_some())
    }

    async fn list(
        &self,
        organization_id: &OrganizationId,
        filters: &CallFilters,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Call>> {
        debug!("Listing calls for {} with filters: {:?}", organization_id, filters);

        let rows = sqlx::query_as::<_, CallRow>(&format!(
            r#"
            SELECT {} FROM calls
            WHERE organization_id = $1
              AND ($2::TEXT IS NULL OR status = $2)
              AND ($3::UUID IS NULL OR campaign_id = $3)
              AND ($4::TEXT IS NULL OR direction = $4)
            ORDER BY created_at DESC
            LIMIT $5 OFFSET $6
            "#,
            CALL_COLUMNS
        ))
        .bind(organization_id.as_uuid())
        .bind(filters.status.as_ref().map(|s| s.as_str().to_string()))
        .bind(filters.campaign_id.map(|id| id.as_uuid()))
        .bind(filters.direction.map(|d| d.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error("Failed to list calls"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count(&self, organization_id: &OrganizationId, filters: &CallFilters) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM calls
            WHERE organization_id = $1
              AND ($2::TEXT IS NULL OR status = $2)
              AND ($3::UUID IS NULL OR campaign_id = $3)
              AND ($4::TEXT IS NULL OR direction = $4)
            "#,
        )
        .bind(organization_id.as_uuid())
        .bind(filters.status.as_ref().map(|s| s.as_str().to_string()))
        .bind(filters.campaign_id.map(|id| id.as_uuid()))
        .bind(filters.direction.map(|d| d.as_str()))
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error("Failed to count calls"))?;

        Ok(count)
    }

    async fn count_by_status(&self, organization_id: &OrganizationId) -> Result<Vec<(String, i64)>> {
        sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT status, COUNT(*) FROM calls
            WHERE organization_id = $1
            GROUP BY status
            ORDER BY status
            "#,
        )
        .bind(organization_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error("Failed to count calls by status"))
    }

    async fn find_stale(&self, updated_before: DateTime<Utc>, limit: i64) -> Result<Vec<Call>> {
        let rows = sqlx::query_as::<_, CallRow>(&format!(
            r#"
            SELECT {} FROM calls
            WHERE vapi_call_id IS NOT NULL
              AND NOT (status = ANY($1))
              AND updated_at < $2
            ORDER BY updated_at ASC
            LIMIT $3
            "#,
            CALL_COLUMNS
        ))
        .bind(TERMINAL_STATUSES.to_vec())
        .bind(updated_before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error("Failed to find stale calls"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
