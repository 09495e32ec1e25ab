//! Vapi voice platform integration

pub mod client;
pub mod webhook;

pub use client::VapiClient;
pub use webhook::{verify_request, VapiWebhook, SECRET_HEADER, SIGNATURE_HEADER};
