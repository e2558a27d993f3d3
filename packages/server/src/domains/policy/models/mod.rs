pub mod policy;
pub mod policy_application;

pub use policy::*;
pub use policy_application::*;
