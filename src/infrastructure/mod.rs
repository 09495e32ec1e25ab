//! Infrastructure layer - Technical implementations
//!
//! This layer contains:
//! - Repository implementations (PostgreSQL and in-memory)
//! - The Vapi voice platform client and webhook envelope
//! - Shared rate limiter backing

pub mod persistence;
pub mod vapi;
