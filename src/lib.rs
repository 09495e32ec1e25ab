//! CallTone - AI voice call orchestration
//!
//! Places outbound calls through a voice AI platform on behalf of an
//! organization's agents and keeps the call records in step with the
//! platform through webhooks and polling. Organized in Domain-Driven
//! Design layers.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;

// Re-export commonly used types
pub use domain::shared::error::DomainError;
pub use domain::shared::result::Result;
