use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::error_response;
use crate::infrastructure::AppState;
use crate::models::rental::{RentalBatchDto, RentalDto};
use crate::models::return_record::ReturnDto;
use crate::services::allocation_service::with_retry;
use crate::services::rental_service::{self, RentalFilter};

#[derive(Deserialize)]
pub struct ListRentalsQuery {
    pub order_id: Option<i32>,
    pub equipment_id: Option<i32>,
    pub status: Option<String>,
}

pub async fn list_rentals(
    State(state): State<AppState>,
    Query(query): Query<ListRentalsQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let rentals = rental_service::list_rentals(
        state.db(),
        RentalFilter {
            order_id: query.order_id,
            equipment_id: query.equipment_id,
            status: query.status,
        },
    )
    .await
    .map_err(error_response)?;

    Ok(Json(json!({ "rentals": rentals })))
}

pub async fn create_rental(
    State(state): State<AppState>,
    Json(payload): Json<RentalDto>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let rental = with_retry(|| {
        rental_service::create_rental(state.db(), &state.line_locks, payload.clone())
    })
    .await
    .map_err(error_response)?;

    Ok(Json(
        json!({ "rental": rental, "message": "Rental created successfully" }),
    ))
}

pub async fn create_rental_batch(
    State(state): State<AppState>,
    Json(payload): Json<RentalBatchDto>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let (batch_id, rentals) = with_retry(|| {
        rental_service::create_rental_batch(
            state.db(),
            &state.line_locks,
            payload.order_id,
            payload.items.clone(),
        )
    })
    .await
    .map_err(error_response)?;

    Ok(Json(json!({
        "batch_id": batch_id,
        "rentals": rentals,
        "message": "Rental batch issued successfully",
    })))
}

pub async fn issue_rental(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let rental = rental_service::issue_rental(state.db(), id)
        .await
        .map_err(error_response)?;

    Ok(Json(
        json!({ "rental": rental, "message": "Rental issued" }),
    ))
}

pub async fn return_rental(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<ReturnDto>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let record = with_retry(|| {
        rental_service::return_rental(state.db(), &state.line_locks, id, payload.clone())
    })
    .await
    .map_err(error_response)?;

    Ok(Json(
        json!({ "return": record, "message": "Rental returned successfully" }),
    ))
}
