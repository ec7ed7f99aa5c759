use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only ledger of (possibly partial) return events. Rows are never
/// mutated after creation; a rental's outstanding quantity is derived from
/// the sum of its return records.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "return_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub rental_id: i32,
    pub return_quantity: i32,
    pub actual_return_date: String,
    /// 'ok', 'damaged' or 'missing'. Anything other than 'ok' requires a
    /// damage description.
    pub condition: String,
    pub damage_description: Option<String>,
    pub additional_charges: f64,
    pub batch_id: Option<String>,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::rental::Entity",
        from = "Column::RentalId",
        to = "super::rental::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Rental,
}

impl Related<super::rental::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rental.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnDto {
    pub return_quantity: i32,
    /// Omitted = today.
    pub actual_return_date: Option<String>,
    pub condition: String,
    pub damage_description: Option<String>,
    pub additional_charges: Option<f64>,
    pub batch_id: Option<String>,
}
