//! Organizations (tenants) and their calling allowance
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::OrganizationId;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Subscription plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    /// Free trial with a fixed end date
    Trial,
    Starter,
    Professional,
    /// Unlimited minutes
    Enterprise,
}

impl SubscriptionPlan {
    /// Included call minutes per month; `None` means unlimited
    pub fn monthly_minutes(&self) -> Option<i64> {
        match self {
            SubscriptionPlan::Trial => Some(50),
            SubscriptionPlan::Starter => Some(500),
            SubscriptionPlan::Professional => Some(2500),
            SubscriptionPlan::Enterprise => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Trial => "trial",
            SubscriptionPlan::Starter => "starter",
            SubscriptionPlan::Professional => "professional",
            SubscriptionPlan::Enterprise => "enterprise",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "trial" => Some(SubscriptionPlan::Trial),
            "starter" => Some(SubscriptionPlan::Starter),
            "professional" => Some(SubscriptionPlan::Professional),
            "enterprise" => Some(SubscriptionPlan::Enterprise),
            _ => None,
        }
    }
}

/// Organization (customer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    /// Business name used in agent greetings
    pub name: String,
    pub plan: SubscriptionPlan,
    /// Overrides the plan allowance when set
    pub minutes_limit: Option<i64>,
    pub seconds_used_this_month: i64,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Create an organization on a 14-day trial
    pub fn new(name: String) -> Self {
        let now = Utc::now();
        Self {
            id: OrganizationId::new(),
            name,
            plan: SubscriptionPlan::Trial,
            minutes_limit: None,
            seconds_used_this_month: 0,
            trial_ends_at: Some(now + Duration::days(14)),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_plan(mut self, plan: SubscriptionPlan) -> Self {
        self.plan = plan;
        if plan != SubscriptionPlan::Trial {
            self.trial_ends_at = None;
        }
        self
    }

    /// Effective monthly allowance in minutes; `None` means unlimited
    pub fn minutes_allowance(&self) -> Option<i64> {
        self.minutes_limit.or_else(|| self.plan.monthly_minutes())
    }

    /// Whole minutes consumed, rounded up per started minute
    pub fn minutes_used(&self) -> i64 {
        (self.seconds_used_this_month + 59) / 60
    }

    /// Check if trial has expired
    pub fn is_trial_expired(&self, now: DateTime<Utc>) -> bool {
        match (self.plan, self.trial_ends_at) {
            (SubscriptionPlan::Trial, Some(trial_end)) => now > trial_end,
            _ => false,
        }
    }
}

/// Repository trait for organization persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    async fn find_by_id(&self, id: &OrganizationId) -> Result<Option<Organization>>;

    /// Add seconds to this month's usage counter
    async fn add_usage_seconds(&self, id: &OrganizationId, seconds: i64) -> Result<()>;
}
