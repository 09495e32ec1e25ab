//! Vendor status event reconciliation

use super::{CallService, CallWebhookEvent};
use crate::domain::call::{Call, CallPatch, CallStatus};
use crate::domain::shared::result::Result;
use tracing::{debug, error, info, warn};

impl From<&CallWebhookEvent> for CallPatch {
    fn from(event: &CallWebhookEvent) -> Self {
        CallPatch {
            status: Some(event.status.clone()),
            transcript: event.transcript.clone(),
            recording_url: event.recording_url.clone(),
            summary: event.summary.clone(),
            sentiment: event.sentiment.clone(),
            duration_seconds: event.duration_seconds,
            ..Default::default()
        }
    }
}

impl CallService {
    /// Apply a pushed status event to the call it names.
    ///
    /// Unknown vendor IDs are a no-op returning `None`. Only storage
    /// failures on the call record itself are returned as errors. Usage is
    /// recorded at most once per call, guarded by the store's billing claim.
    pub async fn handle_call_webhook(&self, event: CallWebhookEvent) -> Result<Option<Call>> {
        let Some(existing) = self.repos.calls.find_by_vendor_id(&event.call_id).await? else {
            warn!("Webhook for unknown call {} ({})", event.call_id, event.status);
            return Ok(None);
        };

        let patch = CallPatch::from(&event);
        let Some(call) = self.repos.calls.apply_patch(&existing.id, &patch).await? else {
            // Row vanished between lookup and write
            warn!("Call {} disappeared during webhook update", existing.id);
            return Ok(None);
        };

        debug!("Call {} updated to {}", call.id, call.status);

        if event.status == CallStatus::Completed {
            match event.duration_seconds {
                Some(duration) => {
                    // Redelivered completions race here; only one claim wins
                    if self.repos.calls.claim_billing(&call.id).await? {
                        if let Err(e) = self
                            .usage
                            .record_call_usage(&call.organization_id, duration, &call.id)
                            .await
                        {
                            error!("Failed to record usage for call {}: {}", call.id, e);
                        }
                    } else {
                        debug!("Call {} already billed, skipping usage", call.id);
                    }
                }
                None => info!("Call {} completed without duration, not billed", call.id),
            }
        }

        if let (Some(contact_id), Some(contact_status)) =
            (call.contact_id, event.status.contact_status())
        {
            if let Err(e) = self
                .repos
                .contacts
                .update_status(&contact_id, contact_status)
                .await
            {
                error!("Failed to update contact {} status: {}", contact_id, e);
            }
        }

        Ok(Some(call))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{no_usage, no_vendor, passing_guardrails, Fixture};
    use super::*;
    use crate::domain::billing::MockUsageRecorder;
    use crate::domain::call::repository::MockCallRepository;
    use crate::domain::call::{CallFilters, CallRepository};
    use crate::domain::contact::{Contact, ContactStatus};
    use crate::domain::shared::error::DomainError;
    use crate::domain::shared::value_objects::{CallId, OrganizationId};
    use crate::domain::vendor::{MockVoiceVendor, VendorCall};
    use crate::infrastructure::persistence::memory::InMemoryCallRepository;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use mockall::predicate::{always, eq};
    use std::sync::Arc;

    /// In-memory store that yields after every vendor-id lookup, so two
    /// joined webhook deliveries both read the row before either writes
    struct InterleavingCalls(Arc<InMemoryCallRepository>);

    #[async_trait]
    impl CallRepository for InterleavingCalls {
        async fn create(&self, call: &Call) -> Result<()> {
            self.0.create(call).await
        }

        async fn find_by_id(&self, id: &CallId) -> Result<Option<Call>> {
            self.0.find_by_id(id).await
        }

        async fn find_by_vendor_id(&self, vapi_call_id: &str) -> Result<Option<Call>> {
            let found = self.0.find_by_vendor_id(vapi_call_id).await;
            tokio::task::yield_now().await;
            found
        }

        async fn find_for_organization(
            &self,
            id: &CallId,
            organization_id: &OrganizationId,
        ) -> Result<Option<Call>> {
            self.0.find_for_organization(id, organization_id).await
        }

        async fn find_retryable(
            &self,
            id: &CallId,
            organization_id: &OrganizationId,
        ) -> Result<Option<Call>> {
            self.0.find_retryable(id, organization_id).await
        }

        async fn apply_patch(&self, id: &CallId, patch: &CallPatch) -> Result<Option<Call>> {
            self.0.apply_patch(id, patch).await
        }

        async fn claim_billing(&self, id: &CallId) -> Result<bool> {
            self.0.claim_billing(id).await
        }

        async fn list(
            &self,
            organization_id: &OrganizationId,
            filters: &CallFilters,
            limit: i64,
            offset: i64,
        ) -> Result<Vec<Call>> {
            self.0.list(organization_id, filters, limit, offset).await
        }

        async fn count(&self, organization_id: &OrganizationId, filters: &CallFilters) -> Result<i64> {
            self.0.count(organization_id, filters).await
        }

        async fn count_by_status(&self, organization_id: &OrganizationId) -> Result<Vec<(String, i64)>> {
            self.0.count_by_status(organization_id).await
        }

        async fn find_stale(&self, updated_before: DateTime<Utc>, limit: i64) -> Result<Vec<Call>> {
            self.0.find_stale(updated_before, limit).await
        }
    }

    fn billing_once(fx: &Fixture, seconds: i32) -> MockUsageRecorder {
        let mut usage = MockUsageRecorder::new();
        usage
            .expect_record_call_usage()
            .with(eq(fx.org.id), eq(seconds), always())
            .times(1)
            .returning(|_, _, _| Ok(()));
        usage
    }

    #[tokio::test]
    async fn test_unknown_call_is_noop() {
        let fx = Fixture::seeded().await;
        let service = fx.service(passing_guardrails(), no_usage(), no_vendor());

        for _ in 0..3 {
            let result = service
                .handle_call_webhook(CallWebhookEvent::new("never-seen", CallStatus::Completed))
                .await
                .unwrap();
            assert!(result.is_none());
        }
        assert!(fx.mem.calls.is_empty().await);
    }

    #[tokio::test]
    async fn test_fields_are_written() {
        let fx = Fixture::seeded().await;
        let call = fx.dispatched_call("vapi-7", CallStatus::Queued).await;
        let service = fx.service(passing_guardrails(), no_usage(), no_vendor());

        let mut event = CallWebhookEvent::new("vapi-7", CallStatus::InProgress);
        event.transcript = Some("Hello?".into());
        event.sentiment = Some("positive".into());
        let updated = service.handle_call_webhook(event).await.unwrap().unwrap();
        assert_eq!(updated.id, call.id);
        assert_eq!(updated.status, CallStatus::InProgress);
        assert_eq!(updated.transcript.as_deref(), Some("Hello?"));

        // Omitted fields are left alone, present ones overwrite
        let mut later = CallWebhookEvent::new("vapi-7", CallStatus::Failed);
        later.transcript = Some("Hello? Anyone?".into());
        let updated = service.handle_call_webhook(later).await.unwrap().unwrap();
        assert_eq!(updated.status, CallStatus::Failed);
        assert_eq!(updated.transcript.as_deref(), Some("Hello? Anyone?"));
        assert_eq!(updated.sentiment.as_deref(), Some("positive"));
    }

    #[tokio::test]
    async fn test_vendor_specific_status_passes_through() {
        let fx = Fixture::seeded().await;
        fx.dispatched_call("vapi-8", CallStatus::Ringing).await;
        let service = fx.service(passing_guardrails(), no_usage(), no_vendor());

        let updated = service
            .handle_call_webhook(CallWebhookEvent::new("vapi-8", "forwarding".into()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status.as_str(), "forwarding");
    }

    #[tokio::test]
    async fn test_billing_matrix() {
        let cases = [
            (CallStatus::Completed, Some(180), true),
            (CallStatus::Completed, None, false),
            (CallStatus::Failed, Some(180), false),
            (CallStatus::Failed, None, false),
        ];

        for (status, duration, bills) in cases {
            let fx = Fixture::seeded().await;
            let call = fx.dispatched_call("vapi-bill", CallStatus::InProgress).await;

            let mut usage = MockUsageRecorder::new();
            let call_id = call.id;
            usage
                .expect_record_call_usage()
                .withf(move |_, seconds, id| *seconds == 180 && *id == call_id)
                .times(usize::from(bills))
                .returning(|_, _, _| Ok(()));

            let service = fx.service(passing_guardrails(), usage, no_vendor());
            let mut event = CallWebhookEvent::new("vapi-bill", status);
            event.duration_seconds = duration;
            service.handle_call_webhook(event).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_redelivered_completion_bills_once() {
        let fx = Fixture::seeded().await;
        fx.dispatched_call("vapi-twice", CallStatus::InProgress).await;
        let service = fx.service(passing_guardrails(), billing_once(&fx, 45), no_vendor());

        for _ in 0..2 {
            let event = CallWebhookEvent::new("vapi-twice", CallStatus::Completed).with_duration(45);
            let call = service.handle_call_webhook(event).await.unwrap().unwrap();
            assert_eq!(call.duration_seconds, Some(45));
        }
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_completions_bill_once() {
        let fx = Fixture::seeded().await;
        let call = fx.dispatched_call("vapi-dup", CallStatus::InProgress).await;
        let calls = Arc::new(InterleavingCalls(fx.mem.calls.clone()));
        let service = fx.service_with_calls(calls, billing_once(&fx, 60), no_vendor());

        let event = CallWebhookEvent::new("vapi-dup", CallStatus::Completed).with_duration(60);
        let (first, second) = tokio::join!(
            service.handle_call_webhook(event.clone()),
            service.handle_call_webhook(event),
        );

        assert_eq!(first.unwrap().unwrap().status, CallStatus::Completed);
        assert_eq!(second.unwrap().unwrap().status, CallStatus::Completed);
        let stored = fx.mem.calls.get(&call.id).await.unwrap();
        assert!(stored.billed_at.is_some());
    }

    #[tokio::test]
    async fn test_lookup_storage_failure_propagates() {
        let fx = Fixture::seeded().await;
        let mut calls = MockCallRepository::new();
        calls
            .expect_find_by_vendor_id()
            .returning(|_| Err(DomainError::Storage("connection refused".into())));
        calls.expect_apply_patch().never();
        let service = fx.service_with_calls(Arc::new(calls), no_usage(), no_vendor());

        let event = CallWebhookEvent::new("vapi-1", CallStatus::Completed).with_duration(60);
        let err = service.handle_call_webhook(event).await.unwrap_err();
        assert!(matches!(err, DomainError::Storage(_)));
    }

    #[tokio::test]
    async fn test_patch_storage_failure_propagates() {
        let fx = Fixture::seeded().await;
        let stored = fx.dispatched_call("vapi-1", CallStatus::InProgress).await;
        let mut calls = MockCallRepository::new();
        calls
            .expect_find_by_vendor_id()
            .returning(move |_| Ok(Some(stored.clone())));
        calls
            .expect_apply_patch()
            .times(1)
            .returning(|_, _| Err(DomainError::Storage("deadlock detected".into())));
        calls.expect_claim_billing().never();
        let service = fx.service_with_calls(Arc::new(calls), no_usage(), no_vendor());

        let event = CallWebhookEvent::new("vapi-1", CallStatus::Completed).with_duration(60);
        let err = service.handle_call_webhook(event).await.unwrap_err();
        assert!(matches!(err, DomainError::Storage(_)));
        assert_eq!(fx.mem.contacts.status_writes().await, 0);
    }

    #[tokio::test]
    async fn test_billing_failure_does_not_fail_webhook() {
        let fx = Fixture::seeded().await;
        fx.dispatched_call("vapi-bf", CallStatus::InProgress).await;
        let mut usage = MockUsageRecorder::new();
        usage
            .expect_record_call_usage()
            .times(1)
            .returning(|_, _, _| Err(DomainError::Storage("connection reset".into())));

        let service = fx.service(passing_guardrails(), usage, no_vendor());
        let event = CallWebhookEvent::new("vapi-bf", CallStatus::Completed).with_duration(30);
        let call = service.handle_call_webhook(event).await.unwrap().unwrap();
        assert_eq!(call.status, CallStatus::Completed);
    }

    #[tokio::test]
    async fn test_contact_status_mapping() {
        let cases = [
            (CallStatus::Completed, Some(ContactStatus::Completed)),
            (CallStatus::Failed, Some(ContactStatus::Failed)),
            (CallStatus::NoAnswer, Some(ContactStatus::Failed)),
            (CallStatus::Ringing, None),
            (CallStatus::Queued, None),
            (CallStatus::InProgress, None),
        ];

        for (status, expected) in cases {
            let fx = Fixture::seeded().await;
            let contact = Contact::new(fx.org.id, "Pat".into(), "+15551234567".into());
            fx.mem.contacts.insert(contact.clone()).await;

            let mut call = fx.dispatched_call("vapi-c", CallStatus::Queued).await;
            call.contact_id = Some(contact.id);
            fx.mem.calls.insert(call).await;

            let service = fx.service(passing_guardrails(), no_usage(), no_vendor());
            service
                .handle_call_webhook(CallWebhookEvent::new("vapi-c", status.clone()))
                .await
                .unwrap();

            let stored = fx.mem.contacts.get(&contact.id).await.unwrap();
            match expected {
                Some(contact_status) => {
                    assert_eq!(stored.status, contact_status, "status {}", status);
                    assert_eq!(fx.mem.contacts.status_writes().await, 1);
                }
                None => {
                    assert_eq!(stored.status, ContactStatus::Pending, "status {}", status);
                    assert_eq!(fx.mem.contacts.status_writes().await, 0);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_no_contact_no_contact_write() {
        for status in [CallStatus::Completed, CallStatus::Failed, CallStatus::NoAnswer] {
            let fx = Fixture::seeded().await;
            fx.dispatched_call("vapi-nc", CallStatus::Queued).await;
            let service = fx.service(passing_guardrails(), no_usage(), no_vendor());
            service
                .handle_call_webhook(CallWebhookEvent::new("vapi-nc", status))
                .await
                .unwrap();
            assert_eq!(fx.mem.contacts.status_writes().await, 0);
        }
    }

    #[tokio::test]
    async fn test_end_to_end_initiate_then_complete() {
        let fx = Fixture::seeded().await;
        let contact = Contact::new(fx.org.id, "Pat".into(), "+15551234567".into());
        fx.mem.contacts.insert(contact.clone()).await;

        let mut vendor = MockVoiceVendor::new();
        vendor.expect_create_call().times(1).returning(|_| {
            Ok(VendorCall {
                id: "vapi-1".into(),
                status: "queued".into(),
            })
        });

        let created_id = std::sync::Arc::new(std::sync::Mutex::new(None));
        let seen = created_id.clone();
        let mut usage = MockUsageRecorder::new();
        let org_id = fx.org.id;
        usage
            .expect_record_call_usage()
            .withf(move |org, seconds, _| *org == org_id && *seconds == 60)
            .times(1)
            .returning(move |_, _, id| {
                *seen.lock().unwrap() = Some(*id);
                Ok(())
            });

        let service = fx.service(passing_guardrails(), usage, vendor);
        let mut request = fx.request();
        request.contact_id = Some(contact.id);
        let call = service.initiate_call(request).await.unwrap();
        assert_eq!(call.vapi_call_id.as_deref(), Some("vapi-1"));
        assert_eq!(call.status, CallStatus::Queued);

        let event = CallWebhookEvent::new("vapi-1", CallStatus::Completed).with_duration(60);
        let updated = service.handle_call_webhook(event).await.unwrap().unwrap();
        assert_eq!(updated.id, call.id);
        assert_eq!(updated.status, CallStatus::Completed);
        assert_eq!(updated.duration_seconds, Some(60));
        assert_eq!(*created_id.lock().unwrap(), Some(call.id));

        let stored = fx.mem.contacts.get(&contact.id).await.unwrap();
        assert_eq!(stored.status, ContactStatus::Completed);
    }
}
