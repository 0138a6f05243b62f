//! PDF entity - the leaf resource. `storage_key` references the stored file
//! in the object storage backend, when one is bound.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "pdfs")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub subject_id: i32,
    pub title: String,
    pub description: String,
    pub file_name: String,
    pub file_url: String,
    pub file_size: i64,
    pub storage_key: Option<String>,
    pub category: PdfCategory,
    pub uploaded_at: i64,
    pub updated_at: i64,
}

/// Closed set of material categories.
#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum PdfCategory {
    #[sea_orm(string_value = "notes")]
    Notes,
    #[sea_orm(string_value = "assignments")]
    Assignments,
    #[sea_orm(string_value = "papers")]
    Papers,
    #[sea_orm(string_value = "other")]
    Other,
}

impl Default for PdfCategory {
    fn default() -> Self {
        PdfCategory::Other
    }
}

impl PdfCategory {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "notes" => Some(PdfCategory::Notes),
            "assignments" => Some(PdfCategory::Assignments),
            "papers" => Some(PdfCategory::Papers),
            "other" => Some(PdfCategory::Other),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::subject::Entity",
        from = "Column::SubjectId",
        to = "super::subject::Column::Id"
    )]
    Subject,
}

impl Related<super::subject::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subject.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
