//! Auth domain - OTP login, agent registration and session tokens.
pub mod actions;
pub mod jwt;
pub mod models;
pub mod role;

pub use actions::*;
pub use jwt::*;
pub use role::*;
