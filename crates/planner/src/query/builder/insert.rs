use crate::query::ast::{common::TableRef, insert::Insert};
use model::transform::mapping::CollectionMapping;

#[derive(Debug, Clone)]
pub struct InsertBuilder {
    ast: Insert,
}

impl InsertBuilder {
    pub fn new(table: TableRef) -> Self {
        Self {
            ast: Insert {
                table,
                columns: Vec::new(),
            },
        }
    }

    pub fn from_mapping(mapping: &CollectionMapping) -> Self {
        Self::new(TableRef::new(&mapping.target_table)).columns(
            mapping
                .columns
                .iter()
                .map(|c| c.target_column.clone())
                .collect(),
        )
    }

    pub fn columns(mut self, columns: Vec<String>) -> Self {
        self.ast.columns = columns;
        self
    }

    pub fn build(self) -> Insert {
        self.ast
    }
}
