//! Equipment Registry - source of truth for total stock and line status
//!
//! total_stock only ever changes here (explicit adjustments) or when a
//! write-off/sale is finalized by the coordinator. Rentals never touch it.

use chrono::Local;
use sea_orm::*;

use crate::domain::StockError;
use crate::models::equipment::{self, Entity as Equipment, EquipmentDto};
use crate::services::allocation_service::LineLocks;
use crate::services::ledger_service::{self, Availability};

const VALID_STATUSES: [&str; 4] = ["available", "borrowed", "maintenance", "retired"];

/// Register a new equipment line.
pub async fn create_equipment(
    db: &DatabaseConnection,
    dto: EquipmentDto,
) -> Result<equipment::Model, StockError> {
    if dto.name.trim().is_empty() {
        return Err(StockError::Validation("name cannot be empty".to_string()));
    }
    if dto.inventory_number.trim().is_empty() {
        return Err(StockError::Validation(
            "inventory_number cannot be empty".to_string(),
        ));
    }
    if dto.total_stock < 0 {
        return Err(StockError::Validation(
            "total_stock cannot be negative".to_string(),
        ));
    }
    if dto.daily_rate < 0.0 {
        return Err(StockError::Validation(
            "daily_rate cannot be negative".to_string(),
        ));
    }

    let status = dto.status.unwrap_or_else(|| "available".to_string());
    validate_status(&status)?;

    let duplicate = Equipment::find()
        .filter(equipment::Column::InventoryNumber.eq(dto.inventory_number.trim()))
        .one(db)
        .await?;
    if duplicate.is_some() {
        return Err(StockError::Validation(format!(
            "inventory number '{}' is already in use",
            dto.inventory_number.trim()
        )));
    }

    let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let line = equipment::ActiveModel {
        name: Set(dto.name.trim().to_owned()),
        inventory_number: Set(dto.inventory_number.trim().to_owned()),
        category_id: Set(dto.category_id),
        total_stock: Set(dto.total_stock),
        daily_rate: Set(dto.daily_rate),
        status: Set(status),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    Ok(line.insert(db).await?)
}

/// Explicit stock adjustment, the only path that grows or shrinks the pool
/// outside finalized sales/write-offs. Runs under the line lock; shrinking
/// below the outstanding quantity is rejected because availability may
/// never go negative.
pub async fn adjust_total_stock(
    db: &DatabaseConnection,
    locks: &LineLocks,
    id: i32,
    delta: i32,
) -> Result<equipment::Model, StockError> {
    if delta == 0 {
        return Err(StockError::Validation("delta cannot be zero".to_string()));
    }

    let _guard = locks.acquire(id).await?;
    let txn = db.begin().await?;

    let line = Equipment::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(StockError::NotFound {
            entity: "equipment",
            id: id.to_string(),
        })?;

    let new_total = line.total_stock + delta;
    if new_total < 0 {
        return Err(StockError::Validation(format!(
            "total_stock cannot go negative (currently {}, delta {})",
            line.total_stock, delta
        )));
    }

    let outstanding = ledger_service::outstanding_quantity(&txn, id).await?;
    if new_total < outstanding {
        return Err(StockError::Validation(format!(
            "cannot reduce total_stock below the outstanding quantity ({})",
            outstanding
        )));
    }

    let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let mut active: equipment::ActiveModel = line.into();
    active.total_stock = Set(new_total);
    active.updated_at = Set(now);
    let updated = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        equipment_id = id,
        delta,
        total_stock = updated.total_stock,
        "stock adjusted"
    );

    Ok(updated)
}

/// Change a line's status. Retired lines reject all subsequent claims.
pub async fn set_status(
    db: &DatabaseConnection,
    id: i32,
    status: &str,
) -> Result<equipment::Model, StockError> {
    validate_status(status)?;

    let line = Equipment::find_by_id(id)
        .one(db)
        .await?
        .ok_or(StockError::NotFound {
            entity: "equipment",
            id: id.to_string(),
        })?;

    let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let mut active: equipment::ActiveModel = line.into();
    active.status = Set(status.to_owned());
    active.updated_at = Set(now);

    Ok(active.update(db).await?)
}

/// Registry view of the derived stock position.
pub async fn get_availability(
    db: &DatabaseConnection,
    id: i32,
) -> Result<Availability, StockError> {
    ledger_service::available_stock(db, id).await
}

pub async fn list_equipment(db: &DatabaseConnection) -> Result<Vec<equipment::Model>, StockError> {
    Ok(Equipment::find()
        .order_by_asc(equipment::Column::Id)
        .all(db)
        .await?)
}

fn validate_status(status: &str) -> Result<(), StockError> {
    if !VALID_STATUSES.contains(&status) {
        return Err(StockError::Validation(format!(
            "status must be one of {:?}, got '{}'",
            VALID_STATUSES, status
        )));
    }
    Ok(())
}
