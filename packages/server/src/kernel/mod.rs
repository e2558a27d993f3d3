//! Kernel module - server infrastructure and dependencies.

pub mod cloudinary;
pub mod deps;
pub mod scheduled_tasks;
pub mod stores;
pub mod test_dependencies;
pub mod traits;

pub use cloudinary::*;
pub use deps::*;
pub use stores::*;
pub use traits::*;
