use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::error_response;
use crate::infrastructure::AppState;
use crate::models::equipment::EquipmentDto;
use crate::services::{allocation_service, equipment_service};

pub async fn list_equipment(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let lines = equipment_service::list_equipment(state.db())
        .await
        .map_err(error_response)?;

    Ok(Json(json!({ "equipment": lines })))
}

pub async fn create_equipment(
    State(state): State<AppState>,
    Json(payload): Json<EquipmentDto>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let line = equipment_service::create_equipment(state.db(), payload)
        .await
        .map_err(error_response)?;

    Ok(Json(
        json!({ "equipment": line, "message": "Equipment line created" }),
    ))
}

pub async fn get_availability(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let availability = equipment_service::get_availability(state.db(), id)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({
        "equipment_id": availability.equipment_id,
        "total_stock": availability.total_stock,
        "outstanding_quantity": availability.outstanding_quantity,
        "available_stock": availability.available_stock,
    })))
}

#[derive(Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i32,
}

pub async fn adjust_stock(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<AdjustStockRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let line = allocation_service::with_retry(|| {
        equipment_service::adjust_total_stock(state.db(), &state.line_locks, id, payload.delta)
    })
    .await
    .map_err(error_response)?;

    Ok(Json(
        json!({ "equipment": line, "message": "Stock adjusted" }),
    ))
}

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

pub async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<SetStatusRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let line = equipment_service::set_status(state.db(), id, &payload.status)
        .await
        .map_err(error_response)?;

    Ok(Json(
        json!({ "equipment": line, "message": "Status updated" }),
    ))
}
