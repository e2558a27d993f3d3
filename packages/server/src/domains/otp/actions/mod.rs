pub mod send_otp;
pub mod verify_otp;

pub use send_otp::*;
pub use verify_otp::*;
