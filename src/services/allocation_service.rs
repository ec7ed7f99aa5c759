//! Allocation Coordinator - the single choke point for claiming and
//! releasing units of an equipment line.
//!
//! Every operation that changes outstanding stock (rental issue, return,
//! sale, write-off, stock adjustment) serializes on a per-line async lock
//! and runs its read-check-write inside one transaction, closing the
//! check-then-act window between "read available stock" and "write new
//! allocation". Different lines never contend.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use dashmap::DashMap;
use sea_orm::*;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::StockError;
use crate::models::equipment::{self, Entity as Equipment};
use crate::models::stock_allocation::{self, AllocationDto, Entity as StockAllocation};
use crate::services::ledger_service;

/// How long a claim may wait for other operations on the same line before
/// failing with ConcurrencyTimeout.
pub const LOCK_TIMEOUT: Duration = Duration::from_millis(250);

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// Per-equipment-line lock registry. Lives in AppState; one mutex per line,
/// created lazily on first claim.
#[derive(Clone, Default)]
pub struct LineLocks {
    locks: Arc<DashMap<i32, Arc<Mutex<()>>>>,
}

impl LineLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for one equipment line, waiting at most
    /// LOCK_TIMEOUT. Timeouts are retryable; callers go through
    /// `with_retry` rather than blocking indefinitely.
    pub async fn acquire(&self, equipment_id: i32) -> Result<OwnedMutexGuard<()>, StockError> {
        let lock = self
            .locks
            .entry(equipment_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        tokio::time::timeout(LOCK_TIMEOUT, lock.lock_owned())
            .await
            .map_err(|_| StockError::ConcurrencyTimeout { equipment_id })
    }
}

/// Validate a claim of `quantity` units against a loaded equipment line,
/// inside the caller's transaction. Shared by rental creation and
/// sale/write-off claims.
pub async fn check_claim<C: ConnectionTrait>(
    conn: &C,
    line: &equipment::Model,
    quantity: i32,
) -> Result<(), StockError> {
    if quantity < 1 {
        return Err(StockError::InvalidQuantity {
            requested: quantity,
        });
    }

    if line.status == "retired" {
        return Err(StockError::InvalidEquipmentState {
            equipment_id: line.id,
            status: line.status.clone(),
        });
    }

    let availability = ledger_service::available_stock(conn, line.id).await?;
    if quantity > availability.available_stock {
        return Err(StockError::InsufficientStock {
            equipment_id: line.id,
            requested: quantity,
            available: availability.available_stock,
        });
    }

    Ok(())
}

/// Guard a release against the currently outstanding quantity. A release of
/// more than is outstanding (including a repeat of an already-completed
/// release) is OverRelease, never a silent double-decrement.
pub fn check_release(id: i32, outstanding: i32, requested: i32) -> Result<(), StockError> {
    if requested < 1 {
        return Err(StockError::InvalidQuantity {
            requested,
        });
    }
    if requested > outstanding {
        return Err(StockError::OverRelease {
            id,
            outstanding,
            requested,
        });
    }
    Ok(())
}

/// Claim units for a sale or write-off. Persists a pending allocation row
/// that counts against availability until it is finalized or cancelled.
pub async fn claim_allocation(
    db: &DatabaseConnection,
    locks: &LineLocks,
    dto: AllocationDto,
) -> Result<stock_allocation::Model, StockError> {
    if dto.kind != "sale" && dto.kind != "write_off" {
        return Err(StockError::Validation(format!(
            "allocation kind must be 'sale' or 'write_off', got '{}'",
            dto.kind
        )));
    }

    let _guard = locks.acquire(dto.equipment_id).await?;
    let txn = db.begin().await?;

    let line = Equipment::find_by_id(dto.equipment_id)
        .one(&txn)
        .await?
        .ok_or(StockError::NotFound {
            entity: "equipment",
            id: dto.equipment_id.to_string(),
        })?;

    check_claim(&txn, &line, dto.quantity).await?;

    let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let allocation = stock_allocation::ActiveModel {
        equipment_id: Set(dto.equipment_id),
        kind: Set(dto.kind),
        quantity: Set(dto.quantity),
        status: Set("pending".to_owned()),
        notes: Set(dto.notes),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    let saved = allocation.insert(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        allocation_id = saved.id,
        equipment_id = saved.equipment_id,
        kind = %saved.kind,
        quantity = saved.quantity,
        "stock claimed"
    );

    Ok(saved)
}

/// Finalize a pending sale/write-off: the units permanently leave the pool,
/// so total_stock shrinks by the claimed quantity in the same transaction.
/// Net availability is unchanged (the pending claim disappears too).
pub async fn finalize_allocation(
    db: &DatabaseConnection,
    locks: &LineLocks,
    id: i32,
) -> Result<stock_allocation::Model, StockError> {
    let allocation = find_allocation(db, id).await?;
    let _guard = locks.acquire(allocation.equipment_id).await?;
    let txn = db.begin().await?;

    let allocation = find_allocation(&txn, id).await?;
    ensure_pending(&allocation)?;

    let line = Equipment::find_by_id(allocation.equipment_id)
        .one(&txn)
        .await?
        .ok_or(StockError::NotFound {
            entity: "equipment",
            id: allocation.equipment_id.to_string(),
        })?;

    let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

    let mut line_active: equipment::ActiveModel = line.clone().into();
    line_active.total_stock = Set(line.total_stock - allocation.quantity);
    line_active.updated_at = Set(now.clone());
    line_active.update(&txn).await?;

    let mut active: stock_allocation::ActiveModel = allocation.into();
    active.status = Set("finalized".to_owned());
    active.updated_at = Set(now);
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    Ok(updated)
}

/// Cancel a pending sale/write-off, releasing its claim on the pool.
pub async fn cancel_allocation(
    db: &DatabaseConnection,
    locks: &LineLocks,
    id: i32,
) -> Result<stock_allocation::Model, StockError> {
    let allocation = find_allocation(db, id).await?;
    let _guard = locks.acquire(allocation.equipment_id).await?;
    let txn = db.begin().await?;

    let allocation = find_allocation(&txn, id).await?;
    ensure_pending(&allocation)?;

    let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let mut active: stock_allocation::ActiveModel = allocation.into();
    active.status = Set("cancelled".to_owned());
    active.updated_at = Set(now);
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    Ok(updated)
}

/// Retry wrapper for claim/release operations. Only lock timeouts are
/// retried; insufficient stock and every other error is terminal for the
/// request and surfaces unchanged.
pub async fn with_retry<T, F, Fut>(mut op: F) -> Result<T, StockError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StockError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(err) if err.is_retryable() && attempt < RETRY_ATTEMPTS => {
                tracing::warn!(attempt, error = %err, "retrying after lock timeout");
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

async fn find_allocation<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> Result<stock_allocation::Model, StockError> {
    StockAllocation::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(StockError::NotFound {
            entity: "allocation",
            id: id.to_string(),
        })
}

fn ensure_pending(allocation: &stock_allocation::Model) -> Result<(), StockError> {
    if allocation.status != "pending" {
        return Err(StockError::Validation(format!(
            "allocation {} is already {}",
            allocation.id, allocation.status
        )));
    }
    Ok(())
}
