//! Fixed-window request rate limiting
//!
//! Counters are owned by an injectable [`RateLimiter`]. The in-memory
//! backing is only correct for a single process; multi-process deployments
//! use a shared backing (see the PostgreSQL limiter in persistence).

use crate::domain::shared::result::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Entries kept before expired windows are swept
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one request against `key`, allowing at most `limit` per `window`
    async fn check(&self, key: &str, limit: u32, window: Duration) -> Result<RateLimitDecision>;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started_at: DateTime<Utc>,
}

/// Process-local rate limiter: key -> (request count, window start)
#[derive(Default)]
pub struct InMemoryRateLimiter {
    windows: Mutex<HashMap<String, Window>>,
}

impl InMemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(&self, key: &str, limit: u32, window: Duration) -> Result<RateLimitDecision> {
        let now = Utc::now();
        let mut windows = self.windows.lock().await;

        if windows.len() > SWEEP_THRESHOLD {
            windows.retain(|_, w| now < w.started_at + window);
        }

        let entry = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started_at: now,
        });

        if now >= entry.started_at + window {
            entry.count = 0;
            entry.started_at = now;
        }

        let reset_at = entry.started_at + window;
        if entry.count < limit {
            entry.count += 1;
            Ok(RateLimitDecision {
                allowed: true,
                remaining: limit - entry.count,
                reset_at,
            })
        } else {
            Ok(RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at,
            })
        }
    }
}
