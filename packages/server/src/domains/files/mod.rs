//! Files domain - relays uploads to the media store.
pub mod actions;

pub use actions::*;
