//! Record entity - one JSON value stored under a namespace and key.
//!
//! This is the whole schema of the database store: registry sidecars,
//! products and the mesh action config all land here, told apart by
//! `namespace`. `position` keeps the insertion order of a namespace so a
//! listing returns records in the order they were written.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Record database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "records")]
pub struct Model {
    /// Which logical store the record belongs to (e.g. "products")
    #[sea_orm(primary_key, auto_increment = false)]
    pub namespace: String,
    /// Key within the namespace (entity or mesh name)
    #[sea_orm(primary_key, auto_increment = false)]
    pub record_key: String,
    /// Order of the record within its namespace
    pub position: i64,
    /// The record serialized as JSON text
    pub value: String,
    /// When the record was last written
    pub updated_at: DateTime,
}

/// Records have no relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
