//! Loading and validating migration plans from their JSON form.

use model::transform::mapping::MigrationPlan;
use std::{collections::HashSet, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("failed to read plan file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed plan: {0}")]
    Json(#[from] serde_json::Error),

    #[error("plan has no table mappings")]
    Empty,

    #[error("invalid mapping for table `{table}`: {reason}")]
    InvalidMapping { table: String, reason: String },
}

pub fn parse(source: &str) -> Result<MigrationPlan, PlanError> {
    let plan: MigrationPlan = serde_json::from_str(source)?;
    validate(&plan)?;
    Ok(plan)
}

pub fn load(path: impl AsRef<Path>) -> Result<MigrationPlan, PlanError> {
    let source = std::fs::read_to_string(path)?;
    parse(&source)
}

/// Structural checks the SQL generator relies on.
pub fn validate(plan: &MigrationPlan) -> Result<(), PlanError> {
    if plan.table_mappings.is_empty() {
        return Err(PlanError::Empty);
    }

    for mapping in &plan.table_mappings {
        let invalid = |reason: String| PlanError::InvalidMapping {
            table: mapping.target_table.clone(),
            reason,
        };

        if mapping.source_collection.trim().is_empty() {
            return Err(invalid("source collection is empty".into()));
        }
        if mapping.target_table.trim().is_empty() {
            return Err(invalid("target table is empty".into()));
        }
        if mapping.columns.is_empty() {
            return Err(invalid("no columns mapped".into()));
        }

        let mut seen = HashSet::new();
        for col in &mapping.columns {
            if col.target_column.trim().is_empty() || col.source_field.trim().is_empty() {
                return Err(invalid("column with empty name".into()));
            }
            if col.data_type.trim().is_empty() {
                return Err(invalid(format!("column `{}` has no type", col.target_column)));
            }
            if !seen.insert(col.target_column.to_lowercase()) {
                return Err(invalid(format!(
                    "column `{}` mapped more than once",
                    col.target_column
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"{
        "migrationId": "6f1c2b1e-2d7a-4a57-9b55-3c1f8f0c9a11",
        "tableMappings": [{
            "sourceCollection": "orders",
            "targetTable": "orders",
            "columns": [
                {"targetColumn": "id", "sourceField": "_id", "dataType": "UUID", "primaryKey": true, "nullable": false},
                {"targetColumn": "customer", "sourceField": "customer", "dataType": "JSONB", "requiresTransformation": true}
            ]
        }]
    }"#;

    #[test]
    fn test_parse_plan_json() {
        let plan = parse(PLAN).unwrap();
        assert_eq!(plan.table_mappings.len(), 1);
        let cols = &plan.table_mappings[0].columns;
        assert!(cols[0].primary_key);
        assert!(!cols[0].nullable);
        assert!(cols[1].requires_transformation);
        assert!(cols[1].nullable);
    }

    #[test]
    fn test_duplicate_columns_are_rejected() {
        let mut plan = parse(PLAN).unwrap();
        let dup = plan.table_mappings[0].columns[1].clone();
        plan.table_mappings[0].columns.push(dup);

        let err = validate(&plan).unwrap_err();
        assert!(matches!(err, PlanError::InvalidMapping { ref table, .. } if table == "orders"));
    }

    #[test]
    fn test_empty_plan_is_rejected() {
        let err = parse(r#"{"tableMappings": []}"#).unwrap_err();
        assert!(matches!(err, PlanError::Empty));
    }
}
