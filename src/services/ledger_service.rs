//! Stock Ledger - derived availability for equipment lines
//!
//! Available stock is never stored; it is always computed as total stock
//! minus every outstanding claim (open rentals net of their returns, plus
//! pending sale/write-off allocations). Correctness depends on all
//! allocation writes going through the allocation coordinator so every
//! claim is visible here.

use sea_orm::*;
use std::collections::HashMap;

use crate::domain::StockError;
use crate::models::equipment::Entity as Equipment;
use crate::models::rental::{self, Entity as Rental};
use crate::models::return_record::{self, Entity as ReturnRecord};
use crate::models::stock_allocation::{self, Entity as StockAllocation};

/// Snapshot of one equipment line's stock position.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Availability {
    pub equipment_id: i32,
    pub total_stock: i32,
    pub outstanding_quantity: i32,
    pub available_stock: i32,
}

/// Compute current availability for an equipment line. Pure read; generic
/// over the connection so the coordinator can evaluate it inside the same
/// transaction as the subsequent allocation write.
pub async fn available_stock<C: ConnectionTrait>(
    conn: &C,
    equipment_id: i32,
) -> Result<Availability, StockError> {
    let line = Equipment::find_by_id(equipment_id)
        .one(conn)
        .await?
        .ok_or(StockError::NotFound {
            entity: "equipment",
            id: equipment_id.to_string(),
        })?;

    let outstanding = outstanding_quantity(conn, equipment_id).await?;

    Ok(Availability {
        equipment_id,
        total_stock: line.total_stock,
        outstanding_quantity: outstanding,
        available_stock: line.total_stock - outstanding,
    })
}

/// Sum of all units currently claimed against an equipment line:
/// open rentals (status created/issued) net of partial returns, plus
/// pending sale/write-off allocations.
pub async fn outstanding_quantity<C: ConnectionTrait>(
    conn: &C,
    equipment_id: i32,
) -> Result<i32, StockError> {
    let open_rentals = Rental::find()
        .filter(rental::Column::EquipmentId.eq(equipment_id))
        .filter(rental::Column::Status.is_in(["created", "issued"]))
        .all(conn)
        .await?;

    // Net out partial returns per rental
    let rental_ids: Vec<i32> = open_rentals.iter().map(|r| r.id).collect();
    let mut returned: HashMap<i32, i32> = HashMap::new();

    if !rental_ids.is_empty() {
        let records = ReturnRecord::find()
            .filter(return_record::Column::RentalId.is_in(rental_ids))
            .all(conn)
            .await?;

        for record in records {
            *returned.entry(record.rental_id).or_insert(0) += record.return_quantity;
        }
    }

    let rental_outstanding: i32 = open_rentals
        .iter()
        .map(|r| r.quantity - returned.get(&r.id).copied().unwrap_or(0))
        .sum();

    let pending = StockAllocation::find()
        .filter(stock_allocation::Column::EquipmentId.eq(equipment_id))
        .filter(stock_allocation::Column::Status.eq("pending"))
        .all(conn)
        .await?;

    let pending_quantity: i32 = pending.iter().map(|a| a.quantity).sum();

    Ok(rental_outstanding + pending_quantity)
}

/// Outstanding quantity of a single rental: original quantity minus the sum
/// of its return records.
pub async fn rental_outstanding<C: ConnectionTrait>(
    conn: &C,
    rental: &rental::Model,
) -> Result<i32, StockError> {
    let records = ReturnRecord::find()
        .filter(return_record::Column::RentalId.eq(rental.id))
        .all(conn)
        .await?;

    let returned: i32 = records.iter().map(|r| r.return_quantity).sum();
    Ok(rental.quantity - returned)
}
