//! OTP domain - issuance and single-use verification of phone passcodes.
pub mod actions;
pub mod models;

pub use actions::*;
