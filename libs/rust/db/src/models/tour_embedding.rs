//! `SeaORM` entity for `tour_embeddings`, maintained by hand alongside the DDL
//! in the embedder's store.
//!
//! The `embedding` column is a pgvector `vector(n)` and has no sea-orm column
//! type, so it is left out of the model and written with raw statements.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "tour_embeddings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub tour_id: i32,
    #[sea_orm(column_type = "Text")]
    pub locale: String,
    #[sea_orm(column_type = "Text")]
    pub embedding_model: String,
    #[sea_orm(column_type = "Text")]
    pub content_hash: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
