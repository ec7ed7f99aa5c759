//! Domain layer - Pure business abstractions
//!
//! This layer contains NO framework dependencies (no Axum). Only error
//! types shared by the service and API layers.

pub mod errors;

pub use errors::StockError;
