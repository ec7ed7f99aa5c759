//! Services Layer
//!
//! Pure business logic without the HTTP layer. Handlers stay thin and call
//! into these modules; tests exercise them directly against an in-memory
//! database.

pub mod allocation_service;
pub mod batch_service;
pub mod equipment_service;
pub mod ledger_service;
pub mod rental_service;
