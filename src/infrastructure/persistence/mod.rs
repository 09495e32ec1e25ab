//! Persistence implementations

pub mod memory;
#[cfg(feature = "postgres")]
pub mod agent_repository;
#[cfg(feature = "postgres")]
pub mod call_repository;
#[cfg(feature = "postgres")]
pub mod contact_repository;
#[cfg(feature = "postgres")]
pub mod database;
#[cfg(feature = "postgres")]
pub mod organization_repository;
#[cfg(feature = "postgres")]
pub mod rate_limiter;

pub use memory::MemoryRepositories;

#[cfg(feature = "postgres")]
pub use agent_repository::PgAgentRepository;
#[cfg(feature = "postgres")]
pub use call_repository::PgCallRepository;
#[cfg(feature = "postgres")]
pub use contact_repository::{PgCampaignRepository, PgContactRepository};
#[cfg(feature = "postgres")]
pub use database::{create_pool, run_migrations};
#[cfg(feature = "postgres")]
pub use organization_repository::{PgOrganizationRepository, PgPhoneNumberRepository};
#[cfg(feature = "postgres")]
pub use rate_limiter::PgRateLimiter;

#[cfg(feature = "postgres")]
use crate::application::call::Repositories;
#[cfg(feature = "postgres")]
use std::sync::Arc;

/// PostgreSQL-backed repositories sharing one pool
#[cfg(feature = "postgres")]
pub fn pg_repositories(pool: sqlx::PgPool) -> Repositories {
    Repositories {
        calls: Arc::new(PgCallRepository::new(pool.clone())),
        agents: Arc::new(PgAgentRepository::new(pool.clone())),
        contacts: Arc::new(PgContactRepository::new(pool.clone())),
        campaigns: Arc::new(PgCampaignRepository::new(pool.clone())),
        phone_numbers: Arc::new(PgPhoneNumberRepository::new(pool.clone())),
        organizations: Arc::new(PgOrganizationRepository::new(pool)),
    }
}
