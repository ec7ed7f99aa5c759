use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Outstanding sale/write-off claims against an equipment line. Rentals
/// have their own table; everything else that reserves units goes through
/// here so the ledger sees every claim.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_allocations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub equipment_id: i32,
    /// 'sale' or 'write_off'.
    pub kind: String,
    pub quantity: i32,
    /// 'pending' counts against availability. 'finalized' means the units
    /// permanently left the pool (total_stock was decremented in the same
    /// transaction). 'cancelled' releases the claim.
    pub status: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::equipment::Entity",
        from = "Column::EquipmentId",
        to = "super::equipment::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Equipment,
}

impl Related<super::equipment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Equipment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationDto {
    pub equipment_id: i32,
    pub kind: String,
    pub quantity: i32,
    pub notes: Option<String>,
}
