//! Defines the AST for a parameterized single-row INSERT statement.

use crate::query::ast::common::TableRef;

/// `INSERT INTO table (c1, .., cn) VALUES ($1, .., $n)`, prepared once and
/// executed per row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Insert {
    pub table: TableRef,
    pub columns: Vec<String>,
}
