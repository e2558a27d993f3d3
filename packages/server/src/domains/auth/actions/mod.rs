pub mod login;
pub mod register_agent;
pub mod session;

pub use login::*;
pub use register_agent::*;
pub use session::*;
