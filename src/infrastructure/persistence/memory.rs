//! In-memory repositories
//!
//! Single-process backing for every port. Used by the test suites and by
//! the `memory` storage backend for local development.

use crate::application::call::Repositories;
use crate::domain::agent::{Agent, AgentRepository, KnowledgeDocument};
use crate::domain::call::{Call, CallFilters, CallPatch, CallRepository};
use crate::domain::campaign::{Campaign, CampaignRepository};
use crate::domain::contact::{Contact, ContactRepository, ContactStatus};
use crate::domain::organization::{Organization, OrganizationRepository};
use crate::domain::phone_number::{PhoneNumber, PhoneNumberRepository};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{
    AgentId, CallId, CampaignId, ContactId, OrganizationId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
pub struct InMemoryCallRepository {
    calls: RwLock<HashMap<CallId, Call>>,
}

impl InMemoryCallRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.calls.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.calls.read().await.is_empty()
    }

    pub async fn all(&self) -> Vec<Call> {
        self.calls.read().await.values().cloned().collect()
    }

    pub async fn get(&self, id: &CallId) -> Option<Call> {
        self.calls.read().await.get(id).cloned()
    }

    /// Insert or replace without uniqueness checks (test seeding)
    pub async fn insert(&self, call: Call) {
        self.calls.write().await.insert(call.id, call);
    }
}

fn vendor_id_taken(calls: &HashMap<CallId, Call>, vapi_call_id: &str, except: &CallId) -> bool {
    calls
        .values()
        .any(|c| &c.id != except && c.vapi_call_id.as_deref() == Some(vapi_call_id))
}

#[async_trait]
impl CallRepository for InMemoryCallRepository {
    async fn create(&self, call: &Call) -> Result<()> {
        let mut calls = self.calls.write().await;
        if calls.contains_key(&call.id) {
            return Err(DomainError::Storage(format!("Call {} already exists", call.id)));
        }
        if let Some(vapi_id) = &call.vapi_call_id {
            if vendor_id_taken(&calls, vapi_id, &call.id) {
                return Err(DomainError::Storage(format!(
                    "Duplicate vapi_call_id {}",
                    vapi_id
                )));
            }
        }
        calls.insert(call.id, call.clone());
        debug!("Created call {}", call.id);
        Ok(())
    }

    async fn find_by_id(&self, id: &CallId) -> Result<Option<Call>> {
        Ok(self.calls.read().await.get(id).cloned())
    }

    async fn find_by_vendor_id(&self, vapi_call_id: &str) -> Result<Option<Call>> {
        Ok(self
            .calls
            .read()
            .await
            .values()
            .find(|c| c.vapi_call_id.as_deref() == Some(vapi_call_id))
            .cloned())
    }

    async fn find_for_organization(
        &self,
        id: &CallId,
        organization_id: &OrganizationId,
    ) -> Result<Option<Call>> {
        Ok(self
            .calls
            .read()
            .await
            .get(id)
            .filter(|c| &c.organization_id == organization_id)
            .cloned())
    }

    async fn find_retryable(
        &self,
        id: &CallId,
        organization_id: &OrganizationId,
    ) -> Result<Option<Call>> {
        Ok(self
            .find_for_organization(id, organization_id)
            .await?
            .filter(|c| c.status.is_retryable()))
    }

    async fn apply_patch(&self, id: &CallId, patch: &CallPatch) -> Result<Option<Call>> {
        let mut calls = self.calls.write().await;
        if let Some(vapi_id) = &patch.vapi_call_id {
            if vendor_id_taken(&calls, vapi_id, id) {
                return Err(DomainError::Storage(format!(
                    "Duplicate vapi_call_id {}",
                    vapi_id
                )));
            }
        }
        Ok(calls.get_mut(id).map(|call| {
            call.apply(patch);
            call.clone()
        }))
    }

    async fn claim_billing(&self, id: &CallId) -> Result<bool> {
        let mut calls = self.calls.write().await;
        match calls.get_mut(id) {
            Some(call) if call.billed_at.is_none() => {
                call.billed_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list(
        &self,
        organization_id: &OrganizationId,
        filters: &CallFilters,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Call>> {
        let mut calls: Vec<Call> = self
            .calls
            .read()
            .await
            .values()
            .filter(|c| &c.organization_id == organization_id && filters.matches(c))
            .cloned()
            .collect();
        calls.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(calls
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count(&self, organization_id: &OrganizationId, filters: &CallFilters) -> Result<i64> {
        Ok(self
            .calls
            .read()
            .await
            .values()
            .filter(|c| &c.organization_id == organization_id && filters.matches(c))
            .count() as i64)
    }

    async fn count_by_status(&self, organization_id: &OrganizationId) -> Result<Vec<(String, i64)>> {
        let mut counts: BTreeMap<String, i64> = BTreeMap::new();
        for call in self.calls.read().await.values() {
            if &call.organization_id == organization_id {
                *counts.entry(call.status.as_str().to_string()).or_default() += 1;
            }
        }
        Ok(counts.into_iter().collect())
    }

    async fn find_stale(&self, updated_before: DateTime<Utc>, limit: i64) -> Result<Vec<Call>> {
        let mut calls: Vec<Call> = self
            .calls
            .read()
            .await
            .values()
            .filter(|c| {
                c.vapi_call_id.is_some() && !c.status.is_terminal() && c.updated_at < updated_before
            })
            .cloned()
            .collect();
        calls.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
        calls.truncate(limit.max(0) as usize);
        Ok(calls)
    }
}

#[derive(Default)]
pub struct InMemoryAgentRepository {
    agents: RwLock<HashMap<AgentId, Agent>>,
    knowledge: RwLock<Vec<KnowledgeDocument>>,
}

impl InMemoryAgentRepository {
    pub async fn insert(&self, agent: Agent) {
        self.agents.write().await.insert(agent.id, agent);
    }

    pub async fn add_knowledge(&self, document: KnowledgeDocument) {
        self.knowledge.write().await.push(document);
    }
}

#[async_trait]
impl AgentRepository for InMemoryAgentRepository {
    async fn find_for_organization(
        &self,
        id: &AgentId,
        organization_id: &OrganizationId,
    ) -> Result<Option<Agent>> {
        Ok(self
            .agents
            .read()
            .await
            .get(id)
            .filter(|a| &a.organization_id == organization_id)
            .cloned())
    }

    async fn list_knowledge(&self, agent_id: &AgentId) -> Result<Vec<KnowledgeDocument>> {
        Ok(self
            .knowledge
            .read()
            .await
            .iter()
            .filter(|d| &d.agent_id == agent_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryContactRepository {
    contacts: RwLock<HashMap<ContactId, Contact>>,
    status_writes: RwLock<usize>,
}

impl InMemoryContactRepository {
    pub async fn insert(&self, contact: Contact) {
        self.contacts.write().await.insert(contact.id, contact);
    }

    pub async fn get(&self, id: &ContactId) -> Option<Contact> {
        self.contacts.read().await.get(id).cloned()
    }

    /// Number of `update_status` calls received
    pub async fn status_writes(&self) -> usize {
        *self.status_writes.read().await
    }
}

#[async_trait]
impl ContactRepository for InMemoryContactRepository {
    async fn find_for_organization(
        &self,
        id: &ContactId,
        organization_id: &OrganizationId,
    ) -> Result<Option<Contact>> {
        Ok(self
            .contacts
            .read()
            .await
            .get(id)
            .filter(|c| &c.organization_id == organization_id)
            .cloned())
    }

    async fn update_status(&self, id: &ContactId, status: ContactStatus) -> Result<()> {
        *self.status_writes.write().await += 1;
        if let Some(contact) = self.contacts.write().await.get_mut(id) {
            contact.status = status;
            contact.updated_at = Utc::now();
        } else {
            debug!("Contact {} not found for status update", id);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCampaignRepository {
    campaigns: RwLock<HashMap<CampaignId, Campaign>>,
}

impl InMemoryCampaignRepository {
    pub async fn insert(&self, campaign: Campaign) {
        self.campaigns.write().await.insert(campaign.id, campaign);
    }
}

#[async_trait]
impl CampaignRepository for InMemoryCampaignRepository {
    async fn find_for_organization(
        &self,
        id: &CampaignId,
        organization_id: &OrganizationId,
    ) -> Result<Option<Campaign>> {
        Ok(self
            .campaigns
            .read()
            .await
            .get(id)
            .filter(|c| &c.organization_id == organization_id)
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryPhoneNumberRepository {
    numbers: RwLock<Vec<PhoneNumber>>,
}

impl InMemoryPhoneNumberRepository {
    pub async fn insert(&self, number: PhoneNumber) {
        self.numbers.write().await.push(number);
    }
}

#[async_trait]
impl PhoneNumberRepository for InMemoryPhoneNumberRepository {
    async fn find_active_for_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<PhoneNumber>> {
        // min_by_key keeps the first of equal keys, so ties go to insertion order
        Ok(self
            .numbers
            .read()
            .await
            .iter()
            .filter(|n| &n.organization_id == organization_id && n.is_active)
            .min_by_key(|n| n.created_at)
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryOrganizationRepository {
    organizations: RwLock<HashMap<OrganizationId, Organization>>,
}

impl InMemoryOrganizationRepository {
    pub async fn insert(&self, organization: Organization) {
        self.organizations
            .write()
            .await
            .insert(organization.id, organization);
    }

    pub async fn get(&self, id: &OrganizationId) -> Option<Organization> {
        self.organizations.read().await.get(id).cloned()
    }
}

#[async_trait]
impl OrganizationRepository for InMemoryOrganizationRepository {
    async fn find_by_id(&self, id: &OrganizationId) -> Result<Option<Organization>> {
        Ok(self.organizations.read().await.get(id).cloned())
    }

    async fn add_usage_seconds(&self, id: &OrganizationId, seconds: i64) -> Result<()> {
        let mut organizations = self.organizations.write().await;
        let org = organizations
            .get_mut(id)
            .ok_or_else(|| DomainError::NotFound("Organization not found".to_string()))?;
        org.seconds_used_this_month += seconds;
        org.updated_at = Utc::now();
        Ok(())
    }
}

/// Concrete handles to every in-memory repository
#[derive(Clone, Default)]
pub struct MemoryRepositories {
    pub calls: Arc<InMemoryCallRepository>,
    pub agents: Arc<InMemoryAgentRepository>,
    pub contacts: Arc<InMemoryContactRepository>,
    pub campaigns: Arc<InMemoryCampaignRepository>,
    pub phone_numbers: Arc<InMemoryPhoneNumberRepository>,
    pub organizations: Arc<InMemoryOrganizationRepository>,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Port view for the application layer
    pub fn repositories(&self) -> Repositories {
        Repositories {
            calls: self.calls.clone(),
            agents: self.agents.clone(),
            contacts: self.contacts.clone(),
            campaigns: self.campaigns.clone(),
            phone_numbers: self.phone_numbers.clone(),
            organizations: self.organizations.clone(),
        }
    }
}
