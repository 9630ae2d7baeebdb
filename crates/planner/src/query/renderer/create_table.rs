use crate::query::{ast::create_table::CreateTable, renderer::Render};

impl Render for CreateTable {
    fn render(&self, r: &mut super::Renderer) {
        r.sql.push_str("CREATE TABLE ");
        if self.if_not_exists {
            r.sql.push_str("IF NOT EXISTS ");
        }
        r.render_table_ref(&self.table);
        r.sql.push_str(" (");

        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                r.sql.push_str(", ");
            }
            r.sql.push_str(&r.dialect.quote_identifier(&col.name));
            r.sql.push(' ');
            r.sql.push_str(&col.data_type);
            if !col.is_nullable {
                r.sql.push_str(" NOT NULL");
            }
            if col.is_primary_key {
                r.sql.push_str(" PRIMARY KEY");
            }
        }

        r.sql.push(')');
    }
}

#[cfg(test)]
mod tests {
    use crate::query::{
        ast::{
            common::TableRef,
            create_table::{ColumnDef, CreateTable},
        },
        dialect::Postgres,
        renderer::{Render, Renderer},
    };

    fn column(name: &str, data_type: &str, is_nullable: bool, is_primary_key: bool) -> ColumnDef {
        ColumnDef {
            name: name.to_string(),
            data_type: data_type.to_string(),
            is_nullable,
            is_primary_key,
        }
    }

    #[test]
    fn test_render_create_table_if_not_exists() {
        let ast = CreateTable {
            table: TableRef::new("orders"),
            columns: vec![
                column("id", "UUID", false, true),
                column("order", "INTEGER", true, false),
                column("amount", "NUMERIC(10,2)", false, false),
            ],
            if_not_exists: true,
        };

        let dialect = Postgres;
        let mut renderer = Renderer::new(&dialect);
        ast.render(&mut renderer);
        let (sql, params) = renderer.finish();

        assert_eq!(
            sql,
            r#"CREATE TABLE IF NOT EXISTS orders (id UUID NOT NULL PRIMARY KEY, "order" INTEGER, amount NUMERIC(10,2) NOT NULL)"#
        );
        assert_eq!(params, 0);
    }

    #[test]
    fn test_reserved_table_name_is_quoted() {
        let ast = CreateTable {
            table: TableRef::new("user"),
            columns: vec![column("name", "TEXT", true, false)],
            if_not_exists: false,
        };

        let dialect = Postgres;
        let mut renderer = Renderer::new(&dialect);
        ast.render(&mut renderer);

        assert_eq!(renderer.finish().0, r#"CREATE TABLE "user" (name TEXT)"#);
    }
}
