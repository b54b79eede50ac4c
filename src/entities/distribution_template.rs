//! Distribution template entity - A named, reusable split of income across wallets.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Distribution template database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "distribution_templates")]
pub struct Model {
    /// Unique identifier for the template
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Account that owns this template
    #[sea_orm(indexed)]
    pub owner_id: String,
    /// Display name (e.g., "Salary split")
    pub name: String,
    /// When the template was saved
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `DistributionTemplate` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A template holds an ordered list of allocations
    #[sea_orm(has_many = "super::distribution_template_allocation::Entity")]
    Allocations,
}

impl Related<super::distribution_template_allocation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Allocations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
