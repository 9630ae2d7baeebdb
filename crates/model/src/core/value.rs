use crate::core::{
    document::Document,
    object_id::{ObjectId, ObjectIdError},
};
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{Map, Number, Value as Json};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ValueError {
    #[error("invalid object id: {0}")]
    ObjectId(#[from] ObjectIdError),

    #[error("invalid {kind} literal: {raw:?}")]
    InvalidNumber { kind: &'static str, raw: String },

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("invalid uuid: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("non-finite float {0} has no JSON representation")]
    NonFiniteFloat(f64),
}

/// A field value read from a source document, or produced by transcoding it
/// for a target column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i64),
    Float(f64),
    String(String),
    ObjectId(ObjectId),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
    Array(Vec<Value>),
    Document(Document),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::ObjectId(_) => "objectId",
            Value::Timestamp(_) => "timestamp",
            Value::Uuid(_) => "uuid",
            Value::Array(_) => "array",
            Value::Document(_) => "document",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Replaces every embedded `ObjectId`, at any depth, with its hex string.
    pub fn stringify_object_ids(self) -> Value {
        match self {
            Value::ObjectId(oid) => Value::String(oid.to_hex()),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(Value::stringify_object_ids)
                    .collect(),
            ),
            Value::Document(doc) => Value::Document(
                doc.into_iter()
                    .map(|(k, v)| (k, v.stringify_object_ids()))
                    .collect(),
            ),
            other => other,
        }
    }

    /// Decodes a (relaxed or canonical) extended JSON value as written by
    /// document store export tools.
    pub fn from_extended_json(json: Json) -> Result<Value, ValueError> {
        match json {
            Json::Null => Ok(Value::Null),
            Json::Bool(b) => Ok(Value::Boolean(b)),
            Json::Number(n) => Ok(match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            }),
            Json::String(s) => Ok(Value::String(s)),
            Json::Array(items) => items
                .into_iter()
                .map(Value::from_extended_json)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Json::Object(map) => from_extended_object(map),
        }
    }

    /// Relaxed extended JSON. Never fails: values without a plain JSON form
    /// use their `$`-prefixed wrappers.
    pub fn to_extended_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Boolean(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => match Number::from_f64(*f) {
                Some(n) => Json::Number(n),
                None => wrap("$numberDouble", Json::String(non_finite_literal(*f))),
            },
            Value::String(s) => Json::String(s.clone()),
            Value::ObjectId(oid) => wrap("$oid", Json::String(oid.to_hex())),
            Value::Timestamp(ts) => wrap("$date", Json::String(iso_millis(ts))),
            Value::Uuid(u) => wrap("$uuid", Json::String(u.to_string())),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_extended_json).collect()),
            Value::Document(doc) => Json::Object(
                doc.iter()
                    .map(|(k, v)| (k.clone(), v.to_extended_json()))
                    .collect(),
            ),
        }
    }

    /// Plain JSON: timestamps become ISO-8601 strings and identifiers become
    /// strings. Fails on values plain JSON cannot carry.
    pub fn to_plain_json(&self) -> Result<Json, ValueError> {
        Ok(match self {
            Value::Null => Json::Null,
            Value::Boolean(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => Json::Number(Number::from_f64(*f).ok_or(ValueError::NonFiniteFloat(*f))?),
            Value::String(s) => Json::String(s.clone()),
            Value::ObjectId(oid) => Json::String(oid.to_hex()),
            Value::Timestamp(ts) => Json::String(iso_millis(ts)),
            Value::Uuid(u) => Json::String(u.to_string()),
            Value::Array(items) => Json::Array(
                items
                    .iter()
                    .map(Value::to_plain_json)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Document(doc) => {
                let mut map = Map::with_capacity(doc.len());
                for (k, v) in doc {
                    map.insert(k.clone(), v.to_plain_json()?);
                }
                Json::Object(map)
            }
        })
    }
}

fn from_extended_object(map: Map<String, Json>) -> Result<Value, ValueError> {
    if map.len() == 1 {
        if let Some((key, inner)) = map.iter().next() {
            match (key.as_str(), inner) {
                ("$oid", Json::String(hex)) => return Ok(Value::ObjectId(ObjectId::parse_str(hex)?)),
                ("$date", inner) => return parse_date(inner).map(Value::Timestamp),
                ("$numberLong" | "$numberInt", Json::String(raw)) => {
                    return raw.parse().map(Value::Int).map_err(|_| ValueError::InvalidNumber {
                        kind: "integer",
                        raw: raw.clone(),
                    });
                }
                ("$numberDouble", Json::String(raw)) => return parse_double(raw).map(Value::Float),
                // decimals keep their exact text
                ("$numberDecimal", Json::String(raw)) => return Ok(Value::String(raw.clone())),
                ("$uuid", Json::String(raw)) => return Ok(Value::Uuid(Uuid::parse_str(raw)?)),
                _ => {}
            }
        }
    }

    let mut doc = Document::with_capacity(map.len());
    for (k, v) in map {
        doc.insert(k, Value::from_extended_json(v)?);
    }
    Ok(Value::Document(doc))
}

fn parse_date(inner: &Json) -> Result<DateTime<Utc>, ValueError> {
    match inner {
        Json::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| ValueError::InvalidDate(format!("{s}: {e}"))),
        Json::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .ok_or_else(|| ValueError::InvalidDate(n.to_string())),
        Json::Object(m) => match m.get("$numberLong") {
            Some(Json::String(raw)) => raw
                .parse::<i64>()
                .ok()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                .ok_or_else(|| ValueError::InvalidDate(raw.clone())),
            _ => Err(ValueError::InvalidDate(inner.to_string())),
        },
        other => Err(ValueError::InvalidDate(other.to_string())),
    }
}

fn parse_double(raw: &str) -> Result<f64, ValueError> {
    match raw {
        "NaN" => Ok(f64::NAN),
        "Infinity" => Ok(f64::INFINITY),
        "-Infinity" => Ok(f64::NEG_INFINITY),
        _ => raw.parse().map_err(|_| ValueError::InvalidNumber {
            kind: "double",
            raw: raw.to_string(),
        }),
    }
}

fn non_finite_literal(f: f64) -> String {
    if f.is_nan() {
        "NaN".into()
    } else if f.is_sign_positive() {
        "Infinity".into()
    } else {
        "-Infinity".into()
    }
}

fn wrap(key: &str, inner: Json) -> Json {
    let mut map = Map::with_capacity(1);
    map.insert(key.to_string(), inner);
    Json::Object(map)
}

fn iso_millis(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "{s}"),
            Value::ObjectId(oid) => write!(f, "{oid}"),
            Value::Timestamp(ts) => write!(f, "{}", iso_millis(ts)),
            Value::Uuid(u) => write!(f, "{u}"),
            Value::Array(_) | Value::Document(_) => write!(f, "{}", self.to_extended_json()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<ObjectId> for Value {
    fn from(v: ObjectId) -> Self {
        Value::ObjectId(v)
    }
}

impl From<Document> for Value {
    fn from(v: Document) -> Self {
        Value::Document(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}
