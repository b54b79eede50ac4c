//! Distribution template allocation entity - One row of a template's split.
//!
//! Exactly one of `percentage` and `fixed_amount` is set. `position` keeps the
//! rows in the order the user entered them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Distribution template allocation database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "distribution_template_allocations")]
pub struct Model {
    /// Unique identifier for the row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Template this row belongs to
    pub template_id: i64,
    /// Zero-based order within the template
    pub position: i32,
    /// Wallet that receives this share; a weak reference
    pub wallet_id: i64,
    /// Share of the total, in percent
    #[sea_orm(column_type = "Decimal(Some((9, 4)))")]
    pub percentage: Option<Decimal>,
    /// Fixed amount regardless of the total
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub fixed_amount: Option<Decimal>,
}

/// Defines relationships between `DistributionTemplateAllocation` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each row belongs to one template
    #[sea_orm(
        belongs_to = "super::distribution_template::Entity",
        from = "Column::TemplateId",
        to = "super::distribution_template::Column::Id",
        on_delete = "Cascade"
    )]
    Template,
}

impl Related<super::distribution_template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Template.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
