//! Interface layer - External interfaces
//!
//! This layer handles:
//! - REST API endpoints for the call lifecycle
//! - Voice platform webhooks
//! - Request/response formatting
//! - Prometheus metrics exposition

pub mod api;
