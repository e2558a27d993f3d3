// Common types and utilities shared across the application

pub mod entity_ids;
pub mod error;
pub mod id;
pub mod response;
pub mod validation;

pub use entity_ids::*;
pub use error::{AppError, FieldError};
pub use id::Id;
pub use response::{ApiResponse, Empty};
