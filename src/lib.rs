pub mod api;
pub mod domain;
pub mod infrastructure;
pub mod models;
pub mod services;

// Convenience re-exports
pub use infrastructure::config;
pub use infrastructure::db;
pub use infrastructure::server;
