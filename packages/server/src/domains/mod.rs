// Domain modules
pub mod agents;
pub mod auth;
pub mod files;
pub mod otp;
pub mod policy;
