// HTTP routes
pub mod auth;
pub mod files;
pub mod health;
pub mod policy;

pub use auth::*;
pub use files::*;
pub use health::*;
pub use policy::*;
