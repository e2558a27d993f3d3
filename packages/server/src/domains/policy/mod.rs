//! Policy domain - typed form definitions and the applications made against them.
pub mod actions;
pub mod models;

pub use actions::*;
