//! Statement generation for a collection mapping. Pure: no I/O.

use crate::query::{
    builder::{create_table::CreateTableBuilder, insert::InsertBuilder},
    dialect::Dialect,
    renderer::{Render, Renderer},
};
use model::transform::mapping::CollectionMapping;

pub struct QueryGenerator<'a> {
    dialect: &'a dyn Dialect,
}

impl<'a> QueryGenerator<'a> {
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self { dialect }
    }

    /// Idempotent `CREATE TABLE IF NOT EXISTS` for the mapping's target table.
    pub fn create_table(&self, mapping: &CollectionMapping) -> String {
        let ast = CreateTableBuilder::from_mapping(mapping)
            .if_not_exists()
            .build();
        self.render(&ast).0
    }

    /// Parameterized INSERT with one placeholder per mapped column.
    pub fn insert(&self, mapping: &CollectionMapping) -> String {
        let ast = InsertBuilder::from_mapping(mapping).build();
        self.render(&ast).0
    }

    fn render(&self, node: &dyn Render) -> (String, usize) {
        let mut renderer = Renderer::new(self.dialect);
        node.render(&mut renderer);
        renderer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::QueryGenerator;
    use crate::query::dialect::Postgres;
    use model::transform::mapping::{CollectionMapping, ColumnMapping};

    fn orders() -> CollectionMapping {
        CollectionMapping::new("orders", "orders")
            .column(ColumnMapping::new("id", "_id", "UUID").primary_key())
            .column(ColumnMapping::new("order", "orderNo", "INTEGER"))
            .column(ColumnMapping::new("amount", "amount", "NUMERIC(10,2)"))
            .column(ColumnMapping::new("items", "items", "JSONB"))
    }

    #[test]
    fn test_create_table_for_mapping() {
        let sql = QueryGenerator::new(&Postgres).create_table(&orders());
        assert_eq!(
            sql,
            r#"CREATE TABLE IF NOT EXISTS orders (id UUID NOT NULL PRIMARY KEY, "order" INTEGER, amount NUMERIC(10,2), items JSONB)"#
        );
    }

    #[test]
    fn test_insert_for_mapping_quotes_reserved_columns_only() {
        let sql = QueryGenerator::new(&Postgres).insert(&orders());
        assert_eq!(
            sql,
            r#"INSERT INTO orders (id, "order", amount, items) VALUES ($1, $2, $3, $4)"#
        );
    }

    #[test]
    fn test_generation_is_deterministic() {
        let generator = QueryGenerator::new(&Postgres);
        assert_eq!(generator.create_table(&orders()), generator.create_table(&orders()));
        assert_eq!(generator.insert(&orders()), generator.insert(&orders()));
    }
}
