//! Application layer - Use cases and application services
//!
//! This layer orchestrates domain objects to fulfill use cases.
//! It's responsible for:
//! - Enforcing guardrails before any record is written
//! - Coordinating the call record with contacts and billing
//! - Talking to the voice platform through its port

pub mod call;
