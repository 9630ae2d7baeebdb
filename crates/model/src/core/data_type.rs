use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, collections::HashMap, fmt};

/// Target column type, parsed from the type string declared in a plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DataType {
    VarChar,
    Char,
    Text,
    Uuid,
    Json,
    Jsonb,
    SmallInt,
    Int,
    BigInt,
    Real,
    Double,
    Numeric,
    Boolean,
    Date,
    Timestamp,
    TimestampTz,
    Bytea,
    Array(Box<DataType>),
    Custom(String),
}

lazy_static! {
    static ref POSTGRES_TYPE_MAP: HashMap<&'static str, DataType> = build_postgres_type_map();
}

impl DataType {
    /// Parses a declared column type such as `VARCHAR(255)`, `jsonb` or
    /// `TEXT[]`. Unknown names are kept as `Custom`.
    pub fn from_declared(declared: &str) -> Self {
        let trimmed = declared.trim();
        if let Some(element) = trimmed.strip_suffix("[]") {
            return DataType::Array(Box::new(Self::from_declared(element)));
        }

        let normalized = Self::normalize_type_name(trimmed);
        POSTGRES_TYPE_MAP
            .get(normalized.as_str())
            .cloned()
            .unwrap_or_else(|| DataType::Custom(trimmed.to_string()))
    }

    /// `JSON` and `JSONB` columns receive JSON text.
    pub fn is_json(&self) -> bool {
        matches!(self, DataType::Json | DataType::Jsonb)
    }

    pub fn is_uuid(&self) -> bool {
        matches!(self, DataType::Uuid)
    }

    pub fn postgres_name(&self) -> Cow<'_, str> {
        match self {
            DataType::VarChar => Cow::Borrowed("VARCHAR"),
            DataType::Char => Cow::Borrowed("CHAR"),
            DataType::Text => Cow::Borrowed("TEXT"),
            DataType::Uuid => Cow::Borrowed("UUID"),
            DataType::Json => Cow::Borrowed("JSON"),
            DataType::Jsonb => Cow::Borrowed("JSONB"),
            DataType::SmallInt => Cow::Borrowed("SMALLINT"),
            DataType::Int => Cow::Borrowed("INTEGER"),
            DataType::BigInt => Cow::Borrowed("BIGINT"),
            DataType::Real => Cow::Borrowed("REAL"),
            DataType::Double => Cow::Borrowed("DOUBLE PRECISION"),
            DataType::Numeric => Cow::Borrowed("NUMERIC"),
            DataType::Boolean => Cow::Borrowed("BOOLEAN"),
            DataType::Date => Cow::Borrowed("DATE"),
            DataType::Timestamp => Cow::Borrowed("TIMESTAMP"),
            DataType::TimestampTz => Cow::Borrowed("TIMESTAMPTZ"),
            DataType::Bytea => Cow::Borrowed("BYTEA"),
            DataType::Array(inner) => Cow::Owned(format!("{}[]", inner.postgres_name())),
            DataType::Custom(name) => Cow::Borrowed(name),
        }
    }

    /// Lowercases and strips any length/precision suffix: `VARCHAR(255)` -> `varchar`.
    fn normalize_type_name(type_name: &str) -> String {
        let base = match type_name.find('(') {
            Some(idx) => &type_name[..idx],
            None => type_name,
        };
        base.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.postgres_name())
    }
}

fn build_postgres_type_map() -> HashMap<&'static str, DataType> {
    HashMap::from([
        ("varchar", DataType::VarChar),
        ("character varying", DataType::VarChar),
        ("char", DataType::Char),
        ("character", DataType::Char),
        ("bpchar", DataType::Char),
        ("text", DataType::Text),
        ("string", DataType::Text),
        ("uuid", DataType::Uuid),
        ("json", DataType::Json),
        ("jsonb", DataType::Jsonb),
        ("smallint", DataType::SmallInt),
        ("int2", DataType::SmallInt),
        ("integer", DataType::Int),
        ("int", DataType::Int),
        ("int4", DataType::Int),
        ("bigint", DataType::BigInt),
        ("int8", DataType::BigInt),
        ("real", DataType::Real),
        ("float4", DataType::Real),
        ("double precision", DataType::Double),
        ("double", DataType::Double),
        ("float8", DataType::Double),
        ("numeric", DataType::Numeric),
        ("decimal", DataType::Numeric),
        ("boolean", DataType::Boolean),
        ("bool", DataType::Boolean),
        ("date", DataType::Date),
        ("timestamp", DataType::Timestamp),
        ("timestamp without time zone", DataType::Timestamp),
        ("timestamptz", DataType::TimestampTz),
        ("timestamp with time zone", DataType::TimestampTz),
        ("bytea", DataType::Bytea),
    ])
}
