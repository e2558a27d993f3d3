//! Agents domain - the field-agent user collection.
pub mod models;

pub use models::*;
