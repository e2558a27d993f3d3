// Agent Portal - API Core
//
// Backend for the multi-role portal: phone OTP login, JWT sessions with
// revocable refresh tokens, policy definitions and their applications, and a
// file relay to object storage.
//
// Business logic lives per-domain in domains/*/actions, storage behind the
// kernel traits, HTTP in server/.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
