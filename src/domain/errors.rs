//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures
//! of the stock allocation and rental lifecycle engine. Each variant carries
//! enough context (equipment id, requested vs. available quantity) for the
//! API layer to render an actionable message.

use std::fmt;

#[derive(Debug)]
pub enum StockError {
    /// Entity (equipment line, rental, allocation) does not exist
    NotFound { entity: &'static str, id: String },
    /// Requested quantity exceeds currently available units
    InsufficientStock {
        equipment_id: i32,
        requested: i32,
        available: i32,
    },
    /// Equipment line is retired or otherwise non-transactable
    InvalidEquipmentState { equipment_id: i32, status: String },
    /// Release exceeds the outstanding quantity of the rental/allocation
    OverRelease {
        id: i32,
        outstanding: i32,
        requested: i32,
    },
    /// Quantity outside the accepted range (must be >= 1)
    InvalidQuantity { requested: i32 },
    /// planned_return_date must be strictly after issue_date
    InvalidDateRange {
        issue_date: String,
        planned_return_date: String,
    },
    /// condition != ok requires a non-empty damage description
    MissingDamageDescription,
    /// Could not acquire the per-line lock within the bounded timeout.
    /// The only retryable error class.
    ConcurrencyTimeout { equipment_id: i32 },
    /// No rental or return record references this batch id
    BatchNotFound { batch_id: String },
    /// Validation error with message
    Validation(String),
    /// Database/persistence error
    Database(String),
}

impl StockError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            StockError::NotFound { .. } => "not_found",
            StockError::InsufficientStock { .. } => "insufficient_stock",
            StockError::InvalidEquipmentState { .. } => "invalid_equipment_state",
            StockError::OverRelease { .. } => "over_release",
            StockError::InvalidQuantity { .. } => "invalid_quantity",
            StockError::InvalidDateRange { .. } => "invalid_date_range",
            StockError::MissingDamageDescription => "missing_damage_description",
            StockError::ConcurrencyTimeout { .. } => "concurrency_timeout",
            StockError::BatchNotFound { .. } => "batch_not_found",
            StockError::Validation(_) => "validation",
            StockError::Database(_) => "database",
        }
    }

    /// Whether a caller may retry the operation unchanged. Insufficient
    /// stock must never be retried blindly; only lock timeouts qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StockError::ConcurrencyTimeout { .. })
    }
}

impl fmt::Display for StockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockError::NotFound { entity, id } => write!(f, "{} {} not found", entity, id),
            StockError::InsufficientStock {
                equipment_id,
                requested,
                available,
            } => write!(
                f,
                "insufficient stock for equipment {}: requested {}, available {}",
                equipment_id, requested, available
            ),
            StockError::InvalidEquipmentState {
                equipment_id,
                status,
            } => write!(
                f,
                "equipment {} is {} and cannot be allocated",
                equipment_id, status
            ),
            StockError::OverRelease {
                id,
                outstanding,
                requested,
            } => write!(
                f,
                "cannot release {} units of rental/allocation {}: only {} outstanding",
                requested, id, outstanding
            ),
            StockError::InvalidQuantity { requested } => {
                write!(f, "quantity must be at least 1, got {}", requested)
            }
            StockError::InvalidDateRange {
                issue_date,
                planned_return_date,
            } => write!(
                f,
                "planned return date {} must be after issue date {}",
                planned_return_date, issue_date
            ),
            StockError::MissingDamageDescription => {
                write!(f, "damage description is required when condition is not ok")
            }
            StockError::ConcurrencyTimeout { equipment_id } => write!(
                f,
                "timed out waiting for concurrent operations on equipment {}",
                equipment_id
            ),
            StockError::BatchNotFound { batch_id } => {
                write!(f, "no records reference batch {}", batch_id)
            }
            StockError::Validation(msg) => write!(f, "validation error: {}", msg),
            StockError::Database(msg) => write!(f, "database error: {}", msg),
        }
    }
}

impl std::error::Error for StockError {}

// Conversion from SeaORM errors (used in the service layer)
impl From<sea_orm::DbErr> for StockError {
    fn from(e: sea_orm::DbErr) -> Self {
        StockError::Database(e.to_string())
    }
}
