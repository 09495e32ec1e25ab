//! Fixed-window rate limiter shared through PostgreSQL

use super::database::storage_error;
use crate::domain::rate_limit::{RateLimitDecision, RateLimiter};
use crate::domain::shared::result::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

/// Counters live in `rate_limits`, so every process sees the same window.
/// The increment and window reset happen in one upsert.
pub struct PgRateLimiter {
    pool: PgPool,
}

impl PgRateLimiter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RateLimiter for PgRateLimiter {
    async fn check(&self, key: &str, limit: u32, window: Duration) -> Result<RateLimitDecision> {
        let (count, window_start): (i32, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO rate_limits (key, count, window_start)
            VALUES ($1, 1, NOW())
            ON CONFLICT (key) DO UPDATE SET
                count = CASE
                    WHEN rate_limits.window_start + $2::FLOAT8 * INTERVAL '1 millisecond' <= NOW()
                    THEN 1
                    ELSE rate_limits.count + 1
                END,
                window_start = CASE
                    WHEN rate_limits.window_start + $2::FLOAT8 * INTERVAL '1 millisecond' <= NOW()
                    THEN NOW()
                    ELSE rate_limits.window_start
                END
            RETURNING count, window_start
            "#,
        )
        .bind(key)
        .bind(window.num_milliseconds() as f64)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error("Failed to check rate limit"))?;

        let count = count.max(0) as u32;
        Ok(RateLimitDecision {
            allowed: count <= limit,
            remaining: limit.saturating_sub(count),
            reset_at: window_start + window,
        })
    }
}
