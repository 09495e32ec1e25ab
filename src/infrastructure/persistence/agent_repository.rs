//! PostgreSQL implementation of AgentRepository

use super::database::storage_error;
use crate::domain::agent::{Agent, AgentRepository, KnowledgeDocument};
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{AgentId, OrganizationId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(FromRow)]
struct AgentRow {
    id: Uuid,
    organization_id: Uuid,
    name: String,
    system_prompt: String,
    vapi_assistant_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AgentRow> for Agent {
    fn from(r: AgentRow) -> Self {
        Agent {
            id: AgentId::from_uuid(r.id),
            organization_id: OrganizationId::from_uuid(r.organization_id),
            name: r.name,
            system_prompt: r.system_prompt,
            vapi_assistant_id: r.vapi_assistant_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(FromRow)]
struct KnowledgeRow {
    id: Uuid,
    agent_id: Uuid,
    title: String,
    content: String,
    created_at: DateTime<Utc>,
}

impl From<KnowledgeRow> for KnowledgeDocument {
    fn from(r: KnowledgeRow) -> Self {
        KnowledgeDocument {
            id: r.id,
            agent_id: AgentId::from_uuid(r.agent_id),
            title: r.title,
            content: r.content,
            created_at: r.created_at,
        }
    }
}

pub struct PgAgentRepository {
    pool: PgPool,
}

impl PgAgentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AgentRepository for PgAgentRepository {
    async fn find_for_organization(
        &self,
        id: &AgentId,
        organization_id: &OrganizationId,
    ) -> Result<Option<Agent>> {
        let row = sqlx::query_as::<_, AgentRow>(
            r#"
            SELECT id, organization_id, name, system_prompt, vapi_assistant_id,
                   created_at, updated_at
            FROM agents
            WHERE id = $1 AND organization_id = $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(organization_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error("Failed to get agent"))?;

        Ok(row.map(Into::into))
    }

    async fn list_knowledge(&self, agent_id: &AgentId) -> Result<Vec<KnowledgeDocument>> {
        let rows = sqlx::query_as::<_, KnowledgeRow>(
            r#"
            SELECT id, agent_id, title, content, created_at
            FROM knowledge_documents
            WHERE agent_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(agent_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error("Failed to list knowledge documents"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
