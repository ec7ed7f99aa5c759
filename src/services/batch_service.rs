//! Batch Grouping Service - shared identifiers for multi-item operations
//!
//! One user action ("issue 5 items to order X at once") gets one batch id
//! stamped on every record it creates, so a single delivery or return
//! document can be rendered from the group. The id is server-generated;
//! uniqueness is the only contract, the format is an implementation detail.

use sea_orm::*;
use uuid::Uuid;

use crate::domain::StockError;
use crate::models::rental::{self, Entity as Rental};
use crate::models::return_record::{self, Entity as ReturnRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Issue,
    Return,
}

/// Generate a unique batch id. UUID v4 makes collisions astronomically
/// unlikely; two unrelated batches ending up with the same id would merge
/// in the batch view, nothing worse.
pub fn new_batch_id(kind: BatchKind) -> String {
    let prefix = match kind {
        BatchKind::Issue => "ISS",
        BatchKind::Return => "RET",
    };
    format!("{}-{}", prefix, Uuid::new_v4())
}

/// All records sharing one batch id, in creation order.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum BatchItems {
    Issues(Vec<rental::Model>),
    Returns(Vec<return_record::Model>),
}

impl BatchItems {
    pub fn len(&self) -> usize {
        match self {
            BatchItems::Issues(items) => items.len(),
            BatchItems::Returns(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Retrieve the records of a batch, ordered by creation sequence, for
/// rendering a combined delivery/return document.
pub async fn items_for_batch(
    db: &DatabaseConnection,
    batch_id: &str,
) -> Result<BatchItems, StockError> {
    let rentals = Rental::find()
        .filter(rental::Column::BatchId.eq(batch_id))
        .order_by_asc(rental::Column::Id)
        .all(db)
        .await?;

    if !rentals.is_empty() {
        return Ok(BatchItems::Issues(rentals));
    }

    let returns = ReturnRecord::find()
        .filter(return_record::Column::BatchId.eq(batch_id))
        .order_by_asc(return_record::Column::Id)
        .all(db)
        .await?;

    if !returns.is_empty() {
        return Ok(BatchItems::Returns(returns));
    }

    Err(StockError::BatchNotFound {
        batch_id: batch_id.to_string(),
    })
}
