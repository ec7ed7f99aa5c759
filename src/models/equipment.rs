use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "equipment")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    /// Unique catalog identifier printed on the physical units.
    pub inventory_number: String,
    pub category_id: Option<i32>,
    /// Total number of physical units owned for this line. Changed only by
    /// explicit stock adjustments and finalized sales/write-offs, never by
    /// rentals. Available stock is always derived from this, never stored.
    pub total_stock: i32,
    /// Catalog price per day. Rentals snapshot this at issue time.
    pub daily_rate: f64,
    /// Status of this equipment line.
    /// Valid values:
    /// - `available`: Normal, transactable
    /// - `borrowed`: Line sourced from a partner depot
    /// - `maintenance`: Units undergoing service, still transactable
    /// - `retired`: Rejects all new allocations
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::rental::Entity")]
    Rental,
    #[sea_orm(has_many = "super::stock_allocation::Entity")]
    StockAllocation,
}

impl Related<super::rental::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rental.def()
    }
}

impl Related<super::stock_allocation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockAllocation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentDto {
    pub name: String,
    pub inventory_number: String,
    pub category_id: Option<i32>,
    pub total_stock: i32,
    pub daily_rate: f64,
    pub status: Option<String>,
}
