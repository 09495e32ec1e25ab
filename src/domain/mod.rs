//! Domain layer - Core business logic and rules
//!
//! This layer contains:
//! - Entities and value objects of the call lifecycle
//! - Repository interfaces (ports for persistence)
//! - Collaborator ports: guardrails, billing, the voice platform
//! - Pure policy: prompt assembly, rate limiting

pub mod agent;
pub mod billing;
pub mod call;
pub mod campaign;
pub mod contact;
pub mod guardrails;
pub mod organization;
pub mod phone_number;
pub mod prompt;
pub mod rate_limit;
pub mod shared;
pub mod vendor;

// Re-export commonly used types
pub use shared::{DomainError, ErrorCode, Result};
