//! Voice agents and their knowledge base
//!
//! Agents are managed elsewhere; the call core only reads them.

use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{AgentId, OrganizationId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// AI voice agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub system_prompt: String,
    /// Assistant identity on the voice platform; `None` until provisioned
    pub vapi_assistant_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    pub fn new(organization_id: OrganizationId, name: String, system_prompt: String) -> Self {
        let now = Utc::now();
        Self {
            id: AgentId::new(),
            organization_id,
            name,
            system_prompt,
            vapi_assistant_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_assistant(mut self, vapi_assistant_id: impl Into<String>) -> Self {
        self.vapi_assistant_id = Some(vapi_assistant_id.into());
        self
    }

    /// Connected to the voice platform and able to place calls
    pub fn voice_assistant_id(&self) -> Option<&str> {
        self.vapi_assistant_id.as_deref().filter(|id| !id.trim().is_empty())
    }

    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Agent fields included in call details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: AgentId,
    pub name: String,
}

/// Knowledge base document attached to an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub id: Uuid,
    pub agent_id: AgentId,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeDocument {
    pub fn new(agent_id: AgentId, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id,
            title: title.into(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Agent repository trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// Find an agent belonging to the organization
    async fn find_for_organization(
        &self,
        id: &AgentId,
        organization_id: &OrganizationId,
    ) -> Result<Option<Agent>>;

    /// Knowledge documents for an agent, oldest first
    async fn list_knowledge(&self, agent_id: &AgentId) -> Result<Vec<KnowledgeDocument>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_readiness() {
        let agent = Agent::new(OrganizationId::new(), "Ava".into(), "Be helpful.".into());
        assert!(agent.voice_assistant_id().is_none());

        let blank = agent.clone().with_assistant("  ");
        assert!(blank.voice_assistant_id().is_none());

        let ready = agent.with_assistant("asst_123");
        assert_eq!(ready.voice_assistant_id(), Some("asst_123"));
    }
}
