//! Outbound call initiation

use super::{
    CallService, InitiateCallRequest, AGENT_NOT_READY, DISPATCH_FAILED, NO_ACTIVE_NUMBER,
};
use crate::domain::agent::Agent;
use crate::domain::call::{Call, CallPatch, CallStatus, NewOutboundCall};
use crate::domain::prompt::{knowledge_block, outbound_call_prompt, outbound_first_message};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{CampaignId, OrganizationId};
use crate::domain::vendor::VendorCallRequest;
use tracing::{error, info, warn};

/// Greeting fallback when the organization name can't be read
const FALLBACK_BUSINESS_NAME: &str = "our team";

impl CallService {
    /// Place an outbound call.
    ///
    /// Guardrail and prerequisite failures happen before any record is
    /// written. Once the record exists it always ends this operation either
    /// carrying the vendor ID or marked `failed`.
    pub async fn initiate_call(&self, request: InitiateCallRequest) -> Result<Call> {
        let org_id = request.organization_id;
        info!(
            "Initiating call for organization {} with agent {}",
            org_id, request.agent_id
        );

        self.guardrails.ensure_trial_expiry(&org_id).await?;

        let minutes = self.guardrails.check_minutes_limit(&org_id).await?;
        if !minutes.allowed {
            info!("Call blocked for organization {}: minutes limit", org_id);
            return Err(DomainError::Forbidden(minutes.denial_message()));
        }

        let agent = self
            .repos
            .agents
            .find_for_organization(&request.agent_id, &org_id)
            .await?;
        let Some((agent, assistant_id)) = agent.and_then(|a| {
            let assistant_id = a.voice_assistant_id()?.to_string();
            Some((a, assistant_id))
        }) else {
            return Err(DomainError::BadRequest(AGENT_NOT_READY.to_string()));
        };

        let knowledge = self.knowledge_for(&agent).await;

        let number = self
            .repos
            .phone_numbers
            .find_active_for_organization(&org_id)
            .await?
            .ok_or_else(|| DomainError::BadRequest(NO_ACTIVE_NUMBER.to_string()))?;

        let call = Call::new_outbound(NewOutboundCall {
            organization_id: org_id,
            agent_id: agent.id,
            to_number: request.phone_number.clone(),
            from_number: number.number.clone(),
            contact_id: request.contact_id,
            campaign_id: request.campaign_id,
        });
        self.repos.calls.create(&call).await?;

        let business_name = self.business_name(&org_id).await;
        let campaign_context = self.campaign_context(request.campaign_id, &org_id).await;

        let vendor_request = VendorCallRequest {
            assistant_id,
            phone_number_id: number.vapi_phone_number_id.clone(),
            from_number: number.number,
            to_number: request.phone_number,
            first_message: outbound_first_message(&agent.name, &business_name),
            system_prompt: outbound_call_prompt(
                &agent.system_prompt,
                campaign_context.as_deref(),
                knowledge.as_deref(),
            ),
            call_id: call.id,
            organization_id: org_id,
        };

        match self.vendor.create_call(vendor_request).await {
            Ok(dispatched) => {
                let status = if dispatched.status.trim().is_empty() {
                    CallStatus::Queued
                } else {
                    CallStatus::parse(&dispatched.status)
                };
                info!("Call {} dispatched as {} ({})", call.id, dispatched.id, status);
                let patch = CallPatch::dispatched(dispatched.id.clone(), status);
                let updated = self
                    .repos
                    .calls
                    .apply_patch(&call.id, &patch)
                    .await
                    .map_err(|e| {
                        // The vendor has the call but webhooks cannot match the record
                        error!(
                            "Call {} dispatched as vendor call {} but the record was not updated: {}",
                            call.id, dispatched.id, e
                        );
                        e
                    })?;
                Ok(updated.unwrap_or_else(|| {
                    let mut call = call;
                    call.apply(&patch);
                    call
                }))
            }
            Err(e) => {
                error!("Vendor rejected dispatch of call {}: {}", call.id, e);
                if let Err(write_err) = self
                    .repos
                    .calls
                    .apply_patch(&call.id, &CallPatch::status(CallStatus::Failed))
                    .await
                {
                    error!("Failed to mark call {} as failed: {}", call.id, write_err);
                }
                Err(DomainError::Internal(DISPATCH_FAILED.to_string()))
            }
        }
    }

    /// Knowledge block for the agent. Lookup failures only drop the block.
    async fn knowledge_for(&self, agent: &Agent) -> Option<String> {
        match self.repos.agents.list_knowledge(&agent.id).await {
            Ok(documents) => knowledge_block(&documents),
            Err(e) => {
                warn!("Knowledge base unavailable for agent {}: {}", agent.id, e);
                None
            }
        }
    }

    async fn business_name(&self, org_id: &OrganizationId) -> String {
        match self.repos.organizations.find_by_id(org_id).await {
            Ok(Some(org)) if !org.name.trim().is_empty() => org.name,
            Ok(_) => FALLBACK_BUSINESS_NAME.to_string(),
            Err(e) => {
                warn!("Could not read organization {}: {}", org_id, e);
                FALLBACK_BUSINESS_NAME.to_string()
            }
        }
    }

    async fn campaign_context(
        &self,
        campaign_id: Option<CampaignId>,
        org_id: &OrganizationId,
    ) -> Option<String> {
        let campaign_id = campaign_id?;
        match self
            .repos
            .campaigns
            .find_for_organization(&campaign_id, org_id)
            .await
        {
            Ok(campaign) => campaign.and_then(|c| c.description),
            Err(e) => {
                warn!("Could not read campaign {}: {}", campaign_id, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{no_usage, no_vendor, passing_guardrails, Fixture};
    use super::*;
    use crate::domain::agent::{Agent, KnowledgeDocument};
    use crate::domain::campaign::Campaign;
    use crate::domain::guardrails::{MinutesCheck, MockGuardrails};
    use crate::domain::organization::Organization;
    use crate::domain::phone_number::PhoneNumber;
    use crate::domain::shared::error::ErrorCode;
    use crate::domain::shared::value_objects::{AgentId, ContactId};
    use crate::domain::call::repository::MockCallRepository;
    use crate::domain::vendor::{MockVoiceVendor, VendorCall, VendorError};
    use std::sync::Arc;
    use tokio_test::assert_err;
    use tracing_test::traced_test;

    fn accepting_vendor(id: &'static str) -> MockVoiceVendor {
        let mut vendor = MockVoiceVendor::new();
        vendor.expect_create_call().times(1).returning(move |_| {
            Ok(VendorCall {
                id: id.to_string(),
                status: "queued".to_string(),
            })
        });
        vendor
    }

    fn failing_vendor(err: VendorError) -> MockVoiceVendor {
        let mut vendor = MockVoiceVendor::new();
        vendor
            .expect_create_call()
            .times(1)
            .returning(move |_| Err(err.clone()));
        vendor
    }

    #[tokio::test]
    async fn test_successful_dispatch() {
        let fx = Fixture::seeded().await;
        let service = fx.service(passing_guardrails(), no_usage(), accepting_vendor("vapi-1"));

        let call = service.initiate_call(fx.request()).await.unwrap();

        assert_eq!(call.vapi_call_id.as_deref(), Some("vapi-1"));
        assert_eq!(call.status, CallStatus::Queued);
        assert_eq!(call.from_number.as_deref(), Some("+15557654321"));
        assert_eq!(call.to_number.as_deref(), Some("+15551234567"));
        assert_eq!(call.agent_id, Some(fx.agent.id));

        let stored = fx.mem.calls.get(&call.id).await.unwrap();
        assert_eq!(stored.vapi_call_id.as_deref(), Some("vapi-1"));
        assert_eq!(fx.mem.calls.len().await, 1);
    }

    #[tokio::test]
    async fn test_vendor_request_contents() {
        let fx = Fixture::seeded().await;
        fx.mem
            .agents
            .add_knowledge(KnowledgeDocument::new(fx.agent.id, "Hours", "Open 9-5"))
            .await;
        let campaign = Campaign::new(fx.org.id, "Recall".into())
            .with_description("Remind patients about their six-month cleaning");
        fx.mem.campaigns.insert(campaign.clone()).await;

        let mut vendor = MockVoiceVendor::new();
        vendor
            .expect_create_call()
            .withf(|req| {
                req.assistant_id == "asst_123"
                    && req.phone_number_id.as_deref() == Some("pn_1")
                    && req.to_number == "+15551234567"
                    && req.first_message.contains("Ava")
                    && req.first_message.contains("Bright Smiles Dental")
                    && req.system_prompt.contains("KNOWLEDGE BASE")
                    && req.system_prompt.contains("Open 9-5")
                    && req.system_prompt.contains("six-month cleaning")
            })
            .times(1)
            .returning(|_| {
                Ok(VendorCall {
                    id: "vapi-2".into(),
                    status: "queued".into(),
                })
            });

        let service = fx.service(passing_guardrails(), no_usage(), vendor);
        let mut request = fx.request();
        request.campaign_id = Some(campaign.id);
        let call = service.initiate_call(request).await.unwrap();
        assert_eq!(call.campaign_id, Some(campaign.id));
    }

    #[tokio::test]
    async fn test_no_knowledge_omits_block() {
        let fx = Fixture::seeded().await;
        let mut vendor = MockVoiceVendor::new();
        vendor
            .expect_create_call()
            .withf(|req| !req.system_prompt.contains("KNOWLEDGE BASE"))
            .times(1)
            .returning(|_| {
                Ok(VendorCall {
                    id: "vapi-3".into(),
                    status: "queued".into(),
                })
            });

        let service = fx.service(passing_guardrails(), no_usage(), vendor);
        assert!(service.initiate_call(fx.request()).await.is_ok());
    }

    #[tokio::test]
    async fn test_trial_expiry_propagates_unchanged() {
        let fx = Fixture::seeded().await;
        let mut guardrails = MockGuardrails::new();
        guardrails
            .expect_ensure_trial_expiry()
            .returning(|_| Err(DomainError::Forbidden("Trial expired".into())));
        guardrails.expect_check_minutes_limit().never();

        let service = fx.service(guardrails, no_usage(), no_vendor());
        let err = service.initiate_call(fx.request()).await.unwrap_err();

        assert_eq!(err, DomainError::Forbidden("Trial expired".into()));
        assert!(fx.mem.calls.is_empty().await);
    }

    #[tokio::test]
    async fn test_minutes_limit_default_reason() {
        let fx = Fixture::seeded().await;
        let mut guardrails = MockGuardrails::new();
        guardrails.expect_ensure_trial_expiry().returning(|_| Ok(()));
        guardrails
            .expect_check_minutes_limit()
            .returning(|_| Ok(MinutesCheck::denied(None)));

        let service = fx.service(guardrails, no_usage(), no_vendor());
        let err = service.initiate_call(fx.request()).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::Forbidden);
        assert_eq!(err.to_string(), "Minutes limit reached");
        assert!(fx.mem.calls.is_empty().await);
    }

    #[tokio::test]
    async fn test_minutes_limit_custom_reason() {
        let fx = Fixture::seeded().await;
        let mut guardrails = MockGuardrails::new();
        guardrails.expect_ensure_trial_expiry().returning(|_| Ok(()));
        guardrails
            .expect_check_minutes_limit()
            .returning(|_| Ok(MinutesCheck::denied(Some("Upgrade for more minutes".into()))));

        let service = fx.service(guardrails, no_usage(), no_vendor());
        let err = service.initiate_call(fx.request()).await.unwrap_err();
        assert_eq!(err, DomainError::Forbidden("Upgrade for more minutes".into()));
    }

    #[tokio::test]
    async fn test_rejected_prerequisites_leave_no_records() {
        // Unknown agent
        let fx = Fixture::seeded().await;
        let service = fx.service(passing_guardrails(), no_usage(), no_vendor());
        let mut request = fx.request();
        request.agent_id = AgentId::new();
        let err = service.initiate_call(request).await.unwrap_err();
        assert_eq!(err, DomainError::BadRequest(AGENT_NOT_READY.into()));
        assert!(fx.mem.calls.is_empty().await);

        // Agent without a voice assistant
        let unready = Agent::new(fx.org.id, "Bo".into(), "prompt".into());
        fx.mem.agents.insert(unready.clone()).await;
        let mut request = fx.request();
        request.agent_id = unready.id;
        let err = service.initiate_call(request).await.unwrap_err();
        assert_eq!(err, DomainError::BadRequest(AGENT_NOT_READY.into()));
        assert!(fx.mem.calls.is_empty().await);

        // Agent of another organization
        let foreign =
            Agent::new(OrganizationId::new(), "Cy".into(), "p".into()).with_assistant("asst_other");
        fx.mem.agents.insert(foreign.clone()).await;
        let mut request = fx.request();
        request.agent_id = foreign.id;
        assert_err!(service.initiate_call(request).await);
        assert!(fx.mem.calls.is_empty().await);
    }

    #[tokio::test]
    async fn test_no_active_number() {
        let fx = Fixture::seeded().await;
        let other_org = Organization::new("Other".into());
        let agent = Agent::new(other_org.id, "Di".into(), "p".into()).with_assistant("asst_9");
        let mut inactive = PhoneNumber::new(other_org.id, "+15550009999".into());
        inactive.is_active = false;
        fx.mem.organizations.insert(other_org.clone()).await;
        fx.mem.agents.insert(agent.clone()).await;
        fx.mem.phone_numbers.insert(inactive).await;

        let service = fx.service(passing_guardrails(), no_usage(), no_vendor());
        let err = service
            .initiate_call(InitiateCallRequest {
                organization_id: other_org.id,
                agent_id: agent.id,
                phone_number: "+15551234567".into(),
                contact_id: None,
                campaign_id: None,
            })
            .await
            .unwrap_err();

        assert_eq!(err, DomainError::BadRequest(NO_ACTIVE_NUMBER.into()));
        assert!(fx.mem.calls.is_empty().await);
    }

    #[tokio::test]
    async fn test_dispatch_failure_marks_call_failed() {
        let errors = vec![
            VendorError::Api {
                status: 500,
                message: "upstream exploded".into(),
            },
            VendorError::Transport("operation timed out".into()),
            // A bare string raised by the client
            VendorError::Other("boom".into()),
        ];

        for vendor_error in errors {
            let fx = Fixture::seeded().await;
            let service = fx.service(passing_guardrails(), no_usage(), failing_vendor(vendor_error));
            let mut request = fx.request();
            request.contact_id = Some(ContactId::new());

            let err = service.initiate_call(request).await.unwrap_err();
            assert_eq!(err.code(), ErrorCode::InternalServerError);
            assert_eq!(err.to_string(), DISPATCH_FAILED);
            assert!(!err.public_message().contains("exploded"));

            let calls = fx.mem.calls.all().await;
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].status, CallStatus::Failed);
            assert!(calls[0].vapi_call_id.is_none());
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_record_update_failure_after_dispatch_logs_vendor_id() {
        let fx = Fixture::seeded().await;
        let mut calls = MockCallRepository::new();
        calls.expect_create().times(1).returning(|_| Ok(()));
        calls
            .expect_apply_patch()
            .times(1)
            .returning(|_, _| Err(DomainError::Storage("connection reset".into())));
        let service =
            fx.service_with_calls(Arc::new(calls), no_usage(), accepting_vendor("vapi-lost"));

        let err = service.initiate_call(fx.request()).await.unwrap_err();

        assert!(matches!(err, DomainError::Storage(_)));
        assert!(logs_contain("dispatched as vendor call vapi-lost"));
    }

    #[tokio::test]
    async fn test_empty_vendor_status_defaults_to_queued() {
        let fx = Fixture::seeded().await;
        let mut vendor = MockVoiceVendor::new();
        vendor.expect_create_call().returning(|_| {
            Ok(VendorCall {
                id: "vapi-9".into(),
                status: String::new(),
            })
        });
        let service = fx.service(passing_guardrails(), no_usage(), vendor);
        let call = service.initiate_call(fx.request()).await.unwrap();
        assert_eq!(call.status, CallStatus::Queued);
    }
}
