use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rentals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub order_id: i32,
    pub equipment_id: i32,
    /// Units allocated by this line item. Outstanding quantity is this
    /// minus the sum of its return records.
    pub quantity: i32,
    pub issue_date: String,
    pub planned_return_date: String,
    /// Price snapshot taken from the equipment line at issue time.
    /// Immutable thereafter; catalog price changes never touch it.
    pub daily_rate: f64,
    /// Lifecycle: 'created' -> 'issued' -> 'returned'.
    /// 'created' and 'issued' both count against available stock.
    pub status: String,
    /// Groups sibling items created in one user action for delivery notes.
    pub batch_id: Option<String>,
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
    #[sea_orm(has_many = "super::return_record::Entity")]
    ReturnRecord,
}

impl Related<super::equipment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Equipment.def()
    }
}

impl Related<super::return_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReturnRecord.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalDto {
    pub order_id: i32,
    pub equipment_id: i32,
    pub quantity: i32,
    pub issue_date: String,
    pub planned_return_date: String,
    /// Price per day for this rental. Omitted = snapshot the catalog rate.
    pub daily_rate: Option<f64>,
    /// 'created' or 'issued'; defaults to 'issued'.
    pub status: Option<String>,
    pub batch_id: Option<String>,
}

/// One line of a multi-item issuance. The order id and the generated batch
/// id are shared across the whole batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalItemDto {
    pub equipment_id: i32,
    pub quantity: i32,
    pub issue_date: String,
    pub planned_return_date: String,
    pub daily_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalBatchDto {
    pub order_id: i32,
    pub items: Vec<RentalItemDto>,
}
