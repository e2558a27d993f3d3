pub mod applications;
pub mod create_policy;

pub use applications::*;
pub use create_policy::*;
