//! Key-value entry entity - Backing table for the persistence boundary.
//! Each row holds one named collection (cached orders, review decisions,
//! payout records) serialized as a JSON document.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Key-value database model - one row per collection key
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "kv_entries")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Collection key (e.g., `"orders"`, `"review_decisions"`)
    #[sea_orm(unique)]
    pub key: String,
    /// Serialized collection contents
    pub value: String,
    /// When this entry was last written
    pub updated_at: DateTime,
}

/// `KvEntry` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
