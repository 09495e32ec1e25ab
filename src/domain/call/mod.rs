//! Call bounded context - the call record and its lifecycle vocabulary

pub mod entity;
pub mod patch;
pub mod repository;
pub mod value_object;

pub use entity::{Call, NewOutboundCall};
pub use patch::CallPatch;
pub use repository::{CallFilters, CallRepository};
pub use value_object::{CallDirection, CallStatus, TERMINAL_STATUSES};
