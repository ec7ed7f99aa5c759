//! Rental Lifecycle Manager - create, issue and return rental line items
//!
//! State machine per line item: created -> issued -> returned. Both
//! 'created' and 'issued' count against available stock; partial returns
//! shrink the outstanding quantity and the item transitions to 'returned'
//! only when it reaches zero. All stock checks delegate to the allocation
//! coordinator under the line lock, inside one transaction per call.

use chrono::{Local, NaiveDate};
use sea_orm::*;
use std::collections::HashMap;

use crate::domain::StockError;
use crate::models::equipment::{self, Entity as Equipment};
use crate::models::rental::{self, Entity as Rental, RentalDto, RentalItemDto};
use crate::models::return_record::{self, Entity as ReturnRecord, ReturnDto};
use crate::services::allocation_service::{self, LineLocks};
use crate::services::batch_service::{self, BatchKind};
use crate::services::ledger_service;

/// Enriched rental with equipment info and derived outstanding quantity
#[derive(Debug, Clone, serde::Serialize)]
pub struct RentalWithDetails {
    pub id: i32,
    pub order_id: i32,
    pub equipment_id: i32,
    pub equipment_name: String,
    pub inventory_number: String,
    pub quantity: i32,
    pub outstanding_quantity: i32,
    pub issue_date: String,
    pub planned_return_date: String,
    pub daily_rate: f64,
    pub status: String,
    pub batch_id: Option<String>,
}

/// Filter parameters for listing rentals
#[derive(Debug, Default, Clone)]
pub struct RentalFilter {
    pub order_id: Option<i32>,
    pub equipment_id: Option<i32>,
    pub status: Option<String>,
}

/// Create a single rental line item. Stock validation happens through the
/// allocation coordinator under the line lock; the daily rate is snapshot
/// from the catalog unless the caller supplies one.
pub async fn create_rental(
    db: &DatabaseConnection,
    locks: &LineLocks,
    dto: RentalDto,
) -> Result<rental::Model, StockError> {
    validate_dates(&dto.issue_date, &dto.planned_return_date)?;
    let status = validate_initial_status(dto.status.as_deref())?;

    let _guard = locks.acquire(dto.equipment_id).await?;
    let txn = db.begin().await?;

    let line = find_equipment(&txn, dto.equipment_id).await?;
    allocation_service::check_claim(&txn, &line, dto.quantity).await?;

    let saved = insert_rental(
        &txn,
        dto.order_id,
        &line,
        &RentalItemDto {
            equipment_id: dto.equipment_id,
            quantity: dto.quantity,
            issue_date: dto.issue_date,
            planned_return_date: dto.planned_return_date,
            daily_rate: dto.daily_rate,
        },
        status,
        dto.batch_id,
    )
    .await?;

    txn.commit().await?;

    tracing::info!(
        rental_id = saved.id,
        equipment_id = saved.equipment_id,
        quantity = saved.quantity,
        "rental created"
    );

    Ok(saved)
}

/// Create several rental line items as one user action. Every item gets the
/// same generated batch id, and the whole batch is all-or-nothing: one
/// failing line rolls everything back, so no partial delivery note exists.
pub async fn create_rental_batch(
    db: &DatabaseConnection,
    locks: &LineLocks,
    order_id: i32,
    items: Vec<RentalItemDto>,
) -> Result<(String, Vec<rental::Model>), StockError> {
    if items.is_empty() {
        return Err(StockError::Validation(
            "batch must contain at least one item".to_string(),
        ));
    }
    for item in &items {
        validate_dates(&item.issue_date, &item.planned_return_date)?;
    }

    // Lock every involved line in ascending id order so two concurrent
    // batches can never deadlock on each other.
    let mut line_ids: Vec<i32> = items.iter().map(|i| i.equipment_id).collect();
    line_ids.sort_unstable();
    line_ids.dedup();

    let mut guards = Vec::with_capacity(line_ids.len());
    for id in line_ids {
        guards.push(locks.acquire(id).await?);
    }

    let batch_id = batch_service::new_batch_id(BatchKind::Issue);
    let txn = db.begin().await?;
    let mut saved = Vec::with_capacity(items.len());

    for item in &items {
        let line = find_equipment(&txn, item.equipment_id).await?;
        // Availability is evaluated inside the transaction, so earlier
        // items of the same batch already count against the same line.
        allocation_service::check_claim(&txn, &line, item.quantity).await?;

        saved.push(
            insert_rental(
                &txn,
                order_id,
                &line,
                item,
                "issued",
                Some(batch_id.clone()),
            )
            .await?,
        );
    }

    txn.commit().await?;

    tracing::info!(batch_id = %batch_id, items = saved.len(), "rental batch issued");

    Ok((batch_id, saved))
}

/// Transition a rental from 'created' to 'issued'. Availability is
/// unaffected; both states are outstanding.
pub async fn issue_rental(
    db: &DatabaseConnection,
    id: i32,
) -> Result<rental::Model, StockError> {
    let rental = find_rental(db, id).await?;

    if rental.status != "created" {
        return Err(StockError::Validation(format!(
            "rental {} is {}, only created rentals can be issued",
            id, rental.status
        )));
    }

    let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let mut active: rental::ActiveModel = rental.into();
    active.status = Set("issued".to_owned());
    active.updated_at = Set(now);

    Ok(active.update(db).await?)
}

/// Return part or all of a rental's outstanding quantity. Appends a return
/// record (never mutated afterwards) and moves the rental to 'returned'
/// once nothing is outstanding. Runs under the line lock so the freed
/// units are visible to concurrent claims exactly once.
pub async fn return_rental(
    db: &DatabaseConnection,
    locks: &LineLocks,
    rental_id: i32,
    dto: ReturnDto,
) -> Result<return_record::Model, StockError> {
    if !matches!(dto.condition.as_str(), "ok" | "damaged" | "missing") {
        return Err(StockError::Validation(format!(
            "condition must be 'ok', 'damaged' or 'missing', got '{}'",
            dto.condition
        )));
    }
    if dto.condition != "ok"
        && dto
            .damage_description
            .as_deref()
            .map(str::trim)
            .unwrap_or("")
            .is_empty()
    {
        return Err(StockError::MissingDamageDescription);
    }

    let rental = find_rental(db, rental_id).await?;

    let _guard = locks.acquire(rental.equipment_id).await?;
    let txn = db.begin().await?;

    // Re-read inside the transaction; a concurrent return may have landed
    // between the lookup and the lock.
    let rental = find_rental(&txn, rental_id).await?;
    let outstanding = ledger_service::rental_outstanding(&txn, &rental).await?;
    allocation_service::check_release(rental.id, outstanding, dto.return_quantity)?;

    let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let today = Local::now().format("%Y-%m-%d").to_string();

    let record = return_record::ActiveModel {
        rental_id: Set(rental.id),
        return_quantity: Set(dto.return_quantity),
        actual_return_date: Set(dto.actual_return_date.unwrap_or(today)),
        condition: Set(dto.condition),
        damage_description: Set(dto.damage_description),
        additional_charges: Set(dto.additional_charges.unwrap_or(0.0)),
        batch_id: Set(dto.batch_id),
        created_at: Set(now.clone()),
        ..Default::default()
    };
    let saved = record.insert(&txn).await?;

    // Fully released: the item leaves the outstanding pool
    if dto.return_quantity == outstanding {
        let mut active: rental::ActiveModel = rental.into();
        active.status = Set("returned".to_owned());
        active.updated_at = Set(now);
        active.update(&txn).await?;
    }

    txn.commit().await?;

    tracing::info!(
        rental_id,
        return_id = saved.id,
        quantity = saved.return_quantity,
        condition = %saved.condition,
        "rental returned"
    );

    Ok(saved)
}

/// List rentals with equipment details and derived outstanding quantities
pub async fn list_rentals(
    db: &DatabaseConnection,
    filter: RentalFilter,
) -> Result<Vec<RentalWithDetails>, StockError> {
    let mut condition = Condition::all();

    if let Some(order_id) = filter.order_id {
        condition = condition.add(rental::Column::OrderId.eq(order_id));
    }
    if let Some(equipment_id) = filter.equipment_id {
        condition = condition.add(rental::Column::EquipmentId.eq(equipment_id));
    }
    if let Some(status) = filter.status {
        condition = condition.add(rental::Column::Status.eq(status));
    }

    let rentals_with_equipment = Rental::find()
        .filter(condition)
        .order_by_desc(rental::Column::Id)
        .find_also_related(Equipment)
        .all(db)
        .await?;

    // Sum returns per rental to derive outstanding quantities
    let rental_ids: Vec<i32> = rentals_with_equipment.iter().map(|(r, _)| r.id).collect();
    let mut returned: HashMap<i32, i32> = HashMap::new();

    if !rental_ids.is_empty() {
        let records = ReturnRecord::find()
            .filter(return_record::Column::RentalId.is_in(rental_ids))
            .all(db)
            .await?;

        for record in records {
            *returned.entry(record.rental_id).or_insert(0) += record.return_quantity;
        }
    }

    let result = rentals_with_equipment
        .into_iter()
        .map(|(rental, line)| {
            let equipment_name = line
                .as_ref()
                .map(|e| e.name.clone())
                .unwrap_or_else(|| "Unknown".to_string());
            let inventory_number = line
                .map(|e| e.inventory_number)
                .unwrap_or_else(|| "Unknown".to_string());
            let outstanding = rental.quantity - returned.get(&rental.id).copied().unwrap_or(0);

            RentalWithDetails {
                id: rental.id,
                order_id: rental.order_id,
                equipment_id: rental.equipment_id,
                equipment_name,
                inventory_number,
                quantity: rental.quantity,
                outstanding_quantity: outstanding,
                issue_date: rental.issue_date,
                planned_return_date: rental.planned_return_date,
                daily_rate: rental.daily_rate,
                status: rental.status,
                batch_id: rental.batch_id,
            }
        })
        .collect();

    Ok(result)
}

fn validate_dates(issue_date: &str, planned_return_date: &str) -> Result<(), StockError> {
    let issue = NaiveDate::parse_from_str(issue_date, "%Y-%m-%d").map_err(|_| {
        StockError::Validation(format!("issue_date '{}' must be YYYY-MM-DD", issue_date))
    })?;
    let planned = NaiveDate::parse_from_str(planned_return_date, "%Y-%m-%d").map_err(|_| {
        StockError::Validation(format!(
            "planned_return_date '{}' must be YYYY-MM-DD",
            planned_return_date
        ))
    })?;

    if planned <= issue {
        return Err(StockError::InvalidDateRange {
            issue_date: issue_date.to_string(),
            planned_return_date: planned_return_date.to_string(),
        });
    }
    Ok(())
}

fn validate_initial_status(status: Option<&str>) -> Result<&'static str, StockError> {
    match status {
        None | Some("issued") => Ok("issued"),
        Some("created") => Ok("created"),
        Some(other) => Err(StockError::Validation(format!(
            "initial rental status must be 'created' or 'issued', got '{}'",
            other
        ))),
    }
}

async fn find_equipment<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> Result<equipment::Model, StockError> {
    Equipment::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(StockError::NotFound {
            entity: "equipment",
            id: id.to_string(),
        })
}

async fn find_rental<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> Result<rental::Model, StockError> {
    Rental::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(StockError::NotFound {
            entity: "rental",
            id: id.to_string(),
        })
}

async fn insert_rental<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
    line: &equipment::Model,
    item: &RentalItemDto,
    status: &str,
    batch_id: Option<String>,
) -> Result<rental::Model, StockError> {
    let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

    let new_rental = rental::ActiveModel {
        order_id: Set(order_id),
        equipment_id: Set(item.equipment_id),
        quantity: Set(item.quantity),
        issue_date: Set(item.issue_date.clone()),
        planned_return_date: Set(item.planned_return_date.clone()),
        daily_rate: Set(item.daily_rate.unwrap_or(line.daily_rate)),
        status: Set(status.to_owned()),
        batch_id: Set(batch_id),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    Ok(new_rental.insert(conn).await?)
}
