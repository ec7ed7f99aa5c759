pub mod allocation;
pub mod batch;
pub mod equipment;
pub mod health;
pub mod rental;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::domain::StockError;
use crate::infrastructure::AppState;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Equipment registry
        .route(
            "/equipment",
            get(equipment::list_equipment).post(equipment::create_equipment),
        )
        .route(
            "/equipment/:id/availability",
            get(equipment::get_availability),
        )
        .route("/equipment/:id/adjust-stock", post(equipment::adjust_stock))
        .route("/equipment/:id/status", post(equipment::set_status))
        // Rentals
        .route(
            "/rentals",
            get(rental::list_rentals).post(rental::create_rental),
        )
        .route("/rentals/batch", post(rental::create_rental_batch))
        .route("/rentals/:id/issue", post(rental::issue_rental))
        .route("/rentals/:id/return", post(rental::return_rental))
        // Sales / write-offs
        .route("/allocations", post(allocation::create_allocation))
        .route(
            "/allocations/:id/finalize",
            post(allocation::finalize_allocation),
        )
        .route(
            "/allocations/:id/cancel",
            post(allocation::cancel_allocation),
        )
        // Batches
        .route("/batches/new", post(batch::new_batch))
        .route("/batches/:batch_id", get(batch::get_batch))
        .with_state(state)
}

/// Map a domain error to an HTTP response with a machine-readable code and
/// whatever context the variant carries (requested vs. available, ...), so
/// the client can render an exact message instead of retrying blindly.
pub(crate) fn error_response(err: StockError) -> (StatusCode, Json<Value>) {
    let status = match &err {
        StockError::NotFound { .. } | StockError::BatchNotFound { .. } => StatusCode::NOT_FOUND,
        StockError::InsufficientStock { .. }
        | StockError::OverRelease { .. }
        | StockError::InvalidEquipmentState { .. } => StatusCode::CONFLICT,
        StockError::ConcurrencyTimeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
        StockError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };

    let details = match &err {
        StockError::InsufficientStock {
            equipment_id,
            requested,
            available,
        } => json!({
            "equipment_id": equipment_id,
            "requested": requested,
            "available": available,
        }),
        StockError::OverRelease {
            id,
            outstanding,
            requested,
        } => json!({
            "id": id,
            "outstanding": outstanding,
            "requested": requested,
        }),
        StockError::ConcurrencyTimeout { equipment_id } => {
            json!({ "equipment_id": equipment_id })
        }
        _ => Value::Null,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "request failed");
    }

    (
        status,
        Json(json!({
            "error": err.code(),
            "message": err.to_string(),
            "details": details,
        })),
    )
}
