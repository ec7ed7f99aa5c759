use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use super::error_response;
use crate::infrastructure::AppState;
use crate::models::stock_allocation::AllocationDto;
use crate::services::allocation_service::{self, with_retry};

pub async fn create_allocation(
    State(state): State<AppState>,
    Json(payload): Json<AllocationDto>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let allocation = with_retry(|| {
        allocation_service::claim_allocation(state.db(), &state.line_locks, payload.clone())
    })
    .await
    .map_err(error_response)?;

    Ok(Json(
        json!({ "allocation": allocation, "message": "Stock claimed" }),
    ))
}

pub async fn finalize_allocation(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let allocation = with_retry(|| {
        allocation_service::finalize_allocation(state.db(), &state.line_locks, id)
    })
    .await
    .map_err(error_response)?;

    Ok(Json(
        json!({ "allocation": allocation, "message": "Allocation finalized" }),
    ))
}

pub async fn cancel_allocation(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let allocation =
        with_retry(|| allocation_service::cancel_allocation(state.db(), &state.line_locks, id))
            .await
            .map_err(error_response)?;

    Ok(Json(
        json!({ "allocation": allocation, "message": "Allocation cancelled" }),
    ))
}
