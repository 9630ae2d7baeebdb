//! Defines the `Dialect` trait for database-specific SQL syntax.

/// Identifiers that must be quoted when used as table or column names.
/// Matching is case-insensitive.
pub const RESERVED_WORDS: &[&str] = &[
    "user",
    "order",
    "group",
    "table",
    "index",
    "select",
    "insert",
    "update",
    "delete",
    "from",
    "where",
    "join",
    "left",
    "right",
    "inner",
    "outer",
    "on",
    "as",
    "and",
    "or",
    "not",
    "null",
    "true",
    "false",
    "default",
    "primary",
    "foreign",
    "key",
    "references",
    "constraint",
    "check",
    "unique",
];

pub fn is_reserved_word(ident: &str) -> bool {
    RESERVED_WORDS.iter().any(|w| w.eq_ignore_ascii_case(ident))
}

pub trait Dialect: Send + Sync {
    /// Renders an identifier (table or column name), quoting it only when
    /// the bare form would collide with a reserved word.
    ///
    /// - PostgreSQL: `order` becomes `"order"`, `amount` stays `amount`
    fn quote_identifier(&self, ident: &str) -> String;

    /// Returns the placeholder for the zero-based parameter `index`.
    ///
    /// - PostgreSQL uses `$1`, `$2`, etc.
    fn get_placeholder(&self, index: usize) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    fn quote_identifier(&self, ident: &str) -> String {
        if is_reserved_word(ident) {
            format!(r#""{ident}""#)
        } else {
            ident.to_string()
        }
    }

    fn get_placeholder(&self, index: usize) -> String {
        // PostgreSQL uses $1, $2, etc.
        format!("${}", index + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_words_are_quoted_case_insensitively() {
        let pg = Postgres;
        assert_eq!(pg.quote_identifier("order"), r#""order""#);
        assert_eq!(pg.quote_identifier("User"), r#""User""#);
        assert_eq!(pg.quote_identifier("KEY"), r#""KEY""#);
    }

    #[test]
    fn test_plain_identifiers_are_left_alone() {
        let pg = Postgres;
        assert_eq!(pg.quote_identifier("amount"), "amount");
        assert_eq!(pg.quote_identifier("orders"), "orders");
        assert_eq!(pg.quote_identifier("user_id"), "user_id");
    }

    #[test]
    fn test_placeholders_are_one_based() {
        assert_eq!(Postgres.get_placeholder(0), "$1");
        assert_eq!(Postgres.get_placeholder(9), "$10");
    }
}
