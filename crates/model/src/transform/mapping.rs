use crate::core::data_type::DataType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Field name that carries a document's identifier.
pub const IDENTIFIER_FIELD: &str = "_id";

/// How one source field lands in one target column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub target_column: String,
    pub source_field: String,
    pub data_type: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub requires_transformation: bool,
}

fn default_nullable() -> bool {
    true
}

impl ColumnMapping {
    pub fn new(
        target_column: impl Into<String>,
        source_field: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        Self {
            target_column: target_column.into(),
            source_field: source_field.into(),
            data_type: data_type.into(),
            nullable: true,
            primary_key: false,
            requires_transformation: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn transformed(mut self) -> Self {
        self.requires_transformation = true;
        self
    }

    pub fn target_type(&self) -> DataType {
        DataType::from_declared(&self.data_type)
    }

    pub fn is_identifier(&self) -> bool {
        self.source_field == IDENTIFIER_FIELD
    }
}

/// One source collection mapped onto one target table. Column order is the
/// order of the DDL and of every INSERT.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CollectionMapping {
    pub source_collection: String,
    pub target_table: String,
    pub columns: Vec<ColumnMapping>,
}

impl CollectionMapping {
    pub fn new(source_collection: impl Into<String>, target_table: impl Into<String>) -> Self {
        Self {
            source_collection: source_collection.into(),
            target_table: target_table.into(),
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnMapping) -> Self {
        self.columns.push(column);
        self
    }
}

/// A versioned set of collection mappings for one migration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MigrationPlan {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub migration_id: Uuid,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    pub table_mappings: Vec<CollectionMapping>,
}

impl MigrationPlan {
    pub fn new(migration_id: Uuid, table_mappings: Vec<CollectionMapping>) -> Self {
        Self {
            id: Uuid::new_v4(),
            migration_id,
            created_at: Utc::now(),
            table_mappings,
        }
    }

    /// Stable fingerprint of the mappings, used in logs to tell plan versions apart.
    pub fn hash(&self) -> String {
        let serialized = serde_json::to_vec(&self.table_mappings).unwrap_or_default();
        format!("{:x}", md5::compute(serialized))
    }
}
