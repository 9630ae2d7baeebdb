use crate::query::ast::{
    common::TableRef,
    create_table::{ColumnDef, CreateTable},
};
use model::transform::mapping::CollectionMapping;

#[derive(Debug, Clone)]
pub struct CreateTableBuilder {
    ast: CreateTable,
}

impl CreateTableBuilder {
    pub fn new(table: TableRef) -> Self {
        Self {
            ast: CreateTable {
                table,
                columns: Vec::new(),
                if_not_exists: false,
            },
        }
    }

    /// One column per mapped field, in declared order.
    pub fn from_mapping(mapping: &CollectionMapping) -> Self {
        mapping.columns.iter().fold(
            Self::new(TableRef::new(&mapping.target_table)),
            |builder, col| {
                builder.column(ColumnDef {
                    name: col.target_column.clone(),
                    data_type: col.data_type.clone(),
                    is_nullable: col.nullable,
                    is_primary_key: col.primary_key,
                })
            },
        )
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.ast.columns.push(column);
        self
    }

    pub fn if_not_exists(mut self) -> Self {
        self.ast.if_not_exists = true;
        self
    }

    pub fn build(self) -> CreateTable {
        self.ast
    }
}
