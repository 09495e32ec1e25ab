//! Pull-based reconciliation against the voice platform

use super::CallService;
use crate::domain::call::{CallPatch, CallStatus};
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::CallId;
use crate::domain::vendor::VendorCallState;
use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

impl From<VendorCallState> for CallPatch {
    fn from(state: VendorCallState) -> Self {
        let status = state.status.trim();
        CallPatch {
            status: (!status.is_empty()).then(|| CallStatus::parse(status)),
            transcript: state.transcript,
            recording_url: state.recording_url,
            started_at: state.started_at,
            ended_at: state.ended_at,
            ..Default::default()
        }
    }
}

impl CallService {
    /// Refresh one call from the platform.
    ///
    /// Returns whether the record was refreshed. Never fails: a missing
    /// call, an undispatched call and any vendor or storage error all
    /// yield `false`.
    pub async fn sync_call_from_vendor(&self, call_id: &CallId) -> bool {
        let call = match self.repos.calls.find_by_id(call_id).await {
            Ok(Some(call)) => call,
            Ok(None) => {
                debug!("Sync skipped, call {} not found", call_id);
                return false;
            }
            Err(e) => {
                warn!("Sync of call {} failed to load record: {}", call_id, e);
                return false;
            }
        };

        let Some(vapi_call_id) = call.vapi_call_id.as_deref() else {
            debug!("Sync skipped, call {} was never dispatched", call_id);
            return false;
        };

        let state = match self.vendor.get_call(vapi_call_id).await {
            Ok(state) => state,
            Err(e) => {
                warn!("Sync of call {} from vendor failed: {}", call_id, e);
                return false;
            }
        };

        match self.repos.calls.apply_patch(call_id, &state.into()).await {
            Ok(Some(updated)) => {
                debug!("Call {} synced, status {}", call_id, updated.status);
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!("Sync of call {} failed to write record: {}", call_id, e);
                false
            }
        }
    }

    /// Sync dispatched, non-terminal calls untouched for `stale_after`.
    ///
    /// Calls are processed one after another. Returns how many were refreshed.
    pub async fn sync_stale_calls(&self, stale_after: Duration, batch_size: i64) -> Result<usize> {
        let cutoff = Utc::now() - stale_after;
        let stale = self.repos.calls.find_stale(cutoff, batch_size).await?;
        if stale.is_empty() {
            return Ok(0);
        }

        let mut refreshed = 0;
        for call in &stale {
            if self.sync_call_from_vendor(&call.id).await {
                refreshed += 1;
            }
        }

        info!("Reconciliation sweep refreshed {}/{} stale calls", refreshed, stale.len());
        Ok(refreshed)
    }
}
