// HTTP server setup (Axum)
pub mod app;
pub mod cookies;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod static_files;

pub use app::*;
