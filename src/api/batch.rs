use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::error_response;
use crate::domain::StockError;
use crate::infrastructure::AppState;
use crate::services::batch_service::{self, BatchKind};

#[derive(Deserialize)]
pub struct NewBatchRequest {
    /// 'issue' or 'return'
    pub kind: String,
}

/// Hand out a fresh batch id so a client performing a multi-item return can
/// stamp every call with the same group. Issuance batches normally get
/// their id from the batch-create endpoint instead.
pub async fn new_batch(
    Json(payload): Json<NewBatchRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let kind = match payload.kind.as_str() {
        "issue" => BatchKind::Issue,
        "return" => BatchKind::Return,
        other => {
            return Err(error_response(StockError::Validation(format!(
                "batch kind must be 'issue' or 'return', got '{}'",
                other
            ))))
        }
    };

    Ok(Json(json!({ "batch_id": batch_service::new_batch_id(kind) })))
}

pub async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let items = batch_service::items_for_batch(state.db(), &batch_id)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({
        "batch_id": batch_id,
        "count": items.len(),
        "batch": items,
    })))
}
