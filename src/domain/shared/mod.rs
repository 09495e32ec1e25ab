//! Shared kernel - Common types used across all bounded contexts

pub mod error;
pub mod result;
pub mod value_objects;

pub use error::{DomainError, ErrorCode};
pub use result::Result;
pub use value_objects::*;
