//! Shared fixtures for the call service unit tests

use super::{CallService, InitiateCallRequest};
use crate::domain::agent::Agent;
use crate::domain::billing::MockUsageRecorder;
use crate::domain::call::{Call, CallRepository, CallStatus, NewOutboundCall};
use crate::domain::guardrails::{MinutesCheck, MockGuardrails};
use crate::domain::organization::{Organization, SubscriptionPlan};
use crate::domain::phone_number::PhoneNumber;
use crate::domain::vendor::MockVoiceVendor;
use crate::infrastructure::persistence::memory::MemoryRepositories;
use std::sync::Arc;

pub(super) struct Fixture {
    pub mem: MemoryRepositories,
    pub org: Organization,
    pub agent: Agent,
    pub number: PhoneNumber,
}

impl Fixture {
    /// Organization with a voice-ready agent and one active number
    pub async fn seeded() -> Self {
        let mem = MemoryRepositories::new();
        let org = Organization::new("Bright Smiles Dental".into()).with_plan(SubscriptionPlan::Starter);
        let agent = Agent::new(org.id, "Ava".into(), "You are Ava, a friendly receptionist.".into())
            .with_assistant("asst_123");
        let mut number = PhoneNumber::new(org.id, "+15557654321".into());
        number.vapi_phone_number_id = Some("pn_1".into());

        mem.organizations.insert(org.clone()).await;
        mem.agents.insert(agent.clone()).await;
        mem.phone_numbers.insert(number.clone()).await;

        Self {
            mem,
            org,
            agent,
            number,
        }
    }

    pub fn request(&self) -> InitiateCallRequest {
        InitiateCallRequest {
            organization_id: self.org.id,
            agent_id: self.agent.id,
            phone_number: "+15551234567".into(),
            contact_id: None,
            campaign_id: None,
        }
    }

    pub fn service(
        &self,
        guardrails: MockGuardrails,
        usage: MockUsageRecorder,
        vendor: MockVoiceVendor,
    ) -> CallService {
        CallService::new(
            self.mem.repositories(),
            Arc::new(guardrails),
            Arc::new(usage),
            Arc::new(vendor),
        )
    }

    /// Service whose call store is swapped out; everything else stays in memory
    pub fn service_with_calls(
        &self,
        calls: Arc<dyn CallRepository>,
        usage: MockUsageRecorder,
        vendor: MockVoiceVendor,
    ) -> CallService {
        let mut repos = self.mem.repositories();
        repos.calls = calls;
        CallService::new(
            repos,
            Arc::new(passing_guardrails()),
            Arc::new(usage),
            Arc::new(vendor),
        )
    }

    /// A dispatched call stored directly, bypassing the initiator
    pub async fn dispatched_call(&self, vapi_call_id: &str, status: CallStatus) -> Call {
        let mut call = Call::new_outbound(NewOutboundCall {
            organization_id: self.org.id,
            agent_id: self.agent.id,
            to_number: "+15551234567".into(),
            from_number: self.number.number.clone(),
            contact_id: None,
            campaign_id: None,
        });
        call.vapi_call_id = Some(vapi_call_id.to_string());
        call.status = status;
        self.mem.calls.insert(call.clone()).await;
        call
    }
}

pub(super) fn passing_guardrails() -> MockGuardrails {
    let mut guardrails = MockGuardrails::new();
    guardrails.expect_ensure_trial_expiry().returning(|_| Ok(()));
    guardrails
        .expect_check_minutes_limit()
        .returning(|_| Ok(MinutesCheck::allowed()));
    guardrails
}

/// Usage recorder that must never be called
pub(super) fn no_usage() -> MockUsageRecorder {
    let mut usage = MockUsageRecorder::new();
    usage.expect_record_call_usage().never();
    usage
}

/// Vendor that must never be called
pub(super) fn no_vendor() -> MockVoiceVendor {
    let mut vendor = MockVoiceVendor::new();
    vendor.expect_create_call().never();
    vendor.expect_get_call().never();
    vendor
}
