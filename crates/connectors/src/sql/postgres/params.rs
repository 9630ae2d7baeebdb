//! Binds transcoded values to whatever parameter type Postgres inferred for
//! each placeholder of a prepared INSERT.

use bytes::{BufMut, BytesMut};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use model::core::value::Value;
use rust_decimal::{Decimal, prelude::FromPrimitive};
use std::{error::Error, str::FromStr};
use tokio_postgres::types::{IsNull, Kind, ToSql, Type, to_sql_checked};
use uuid::Uuid;

type EncodeResult = Result<IsNull, Box<dyn Error + Sync + Send>>;

/// JSONB binary format version byte.
const JSONB_VERSION: u8 = 1;

#[derive(Debug)]
pub struct PgParam<'a>(pub &'a Value);

impl ToSql for PgParam<'_> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> EncodeResult {
        encode(self.0, ty, out)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

pub struct PgParamStore<'a> {
    pub params: Vec<PgParam<'a>>,
}

impl<'a> PgParamStore<'a> {
    pub fn from_values(values: &'a [Value]) -> Self {
        Self {
            params: values.iter().map(PgParam).collect(),
        }
    }

    pub fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|param| param as &(dyn ToSql + Sync))
            .collect::<Vec<_>>()
    }
}

fn encode(value: &Value, ty: &Type, out: &mut BytesMut) -> EncodeResult {
    if value.is_null() {
        return Ok(IsNull::Yes);
    }
    if *ty == Type::JSON || *ty == Type::JSONB {
        return encode_json(value, ty, out);
    }
    if let Kind::Array(member) = ty.kind() {
        return encode_array(value, ty, member, out);
    }

    match value {
        Value::Null => Ok(IsNull::Yes),
        Value::Boolean(b) => match ty.name() {
            "bool" => b.to_sql(ty, out),
            "int2" => i16::from(*b).to_sql(ty, out),
            "int4" => i32::from(*b).to_sql(ty, out),
            "int8" => i64::from(*b).to_sql(ty, out),
            _ => write_text(&b.to_string(), out),
        },
        Value::Int(i) => encode_int(*i, ty, out),
        Value::Float(f) => encode_float(*f, ty, out),
        Value::String(s) => encode_str(s, ty, out),
        Value::ObjectId(oid) => match ty.name() {
            "bytea" => oid.bytes().as_slice().to_sql(ty, out),
            _ => write_text(&oid.to_hex(), out),
        },
        Value::Timestamp(ts) => match ty.name() {
            "timestamptz" => ts.to_sql(ty, out),
            "timestamp" => ts.naive_utc().to_sql(ty, out),
            "date" => ts.date_naive().to_sql(ty, out),
            "int8" => ts.timestamp_millis().to_sql(ty, out),
            _ => write_text(&value.to_string(), out),
        },
        Value::Uuid(u) => match ty.name() {
            "uuid" => u.to_sql(ty, out),
            "bytea" => u.as_bytes().as_slice().to_sql(ty, out),
            _ => write_text(&u.to_string(), out),
        },
        Value::Array(_) | Value::Document(_) => write_text(&value.to_extended_json().to_string(), out),
    }
}

fn encode_int(i: i64, ty: &Type, out: &mut BytesMut) -> EncodeResult {
    match ty.name() {
        "int2" => i16::try_from(i)?.to_sql(ty, out),
        "int4" => i32::try_from(i)?.to_sql(ty, out),
        "int8" => i.to_sql(ty, out),
        "float4" => (i as f32).to_sql(ty, out),
        "float8" => (i as f64).to_sql(ty, out),
        "numeric" => Decimal::from(i).to_sql(ty, out),
        "bool" => (i != 0).to_sql(ty, out),
        _ => write_text(&i.to_string(), out),
    }
}

fn encode_float(f: f64, ty: &Type, out: &mut BytesMut) -> EncodeResult {
    match ty.name() {
        "float4" => (f as f32).to_sql(ty, out),
        "float8" => f.to_sql(ty, out),
        "numeric" => Decimal::from_f64(f)
            .ok_or_else(|| format!("{f} cannot be stored as numeric"))?
            .to_sql(ty, out),
        "int2" | "int4" | "int8" if f.fract() == 0.0 => encode_int(f as i64, ty, out),
        "int2" | "int4" | "int8" => Err(format!("{f} is not an integer").into()),
        _ => write_text(&f.to_string(), out),
    }
}

fn encode_str(s: &str, ty: &Type, out: &mut BytesMut) -> EncodeResult {
    match ty.name() {
        "uuid" => Uuid::parse_str(s)?.to_sql(ty, out),
        "int2" => s.trim().parse::<i16>()?.to_sql(ty, out),
        "int4" => s.trim().parse::<i32>()?.to_sql(ty, out),
        "int8" => s.trim().parse::<i64>()?.to_sql(ty, out),
        "float4" => s.trim().parse::<f32>()?.to_sql(ty, out),
        "float8" => s.trim().parse::<f64>()?.to_sql(ty, out),
        "numeric" => Decimal::from_str(s.trim())?.to_sql(ty, out),
        "bool" => s.trim().parse::<bool>()?.to_sql(ty, out),
        "timestamptz" => DateTime::parse_from_rfc3339(s)?
            .with_timezone(&Utc)
            .to_sql(ty, out),
        "timestamp" => NaiveDateTime::from_str(s)?.to_sql(ty, out),
        "date" => NaiveDate::from_str(s)?.to_sql(ty, out),
        "bytea" => s.as_bytes().to_sql(ty, out),
        // text-compatible types (text, varchar, enums, citext, ...)
        _ => write_text(s, out),
    }
}

fn encode_json(value: &Value, ty: &Type, out: &mut BytesMut) -> EncodeResult {
    // strings arriving here are JSON text already rendered by the transcoder
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_extended_json().to_string(),
    };
    if *ty == Type::JSONB {
        out.put_u8(JSONB_VERSION);
    }
    out.put_slice(text.as_bytes());
    Ok(IsNull::No)
}

fn encode_array(value: &Value, ty: &Type, member: &Type, out: &mut BytesMut) -> EncodeResult {
    match value {
        Value::Array(items) => items
            .iter()
            .map(PgParam)
            .collect::<Vec<_>>()
            .to_sql(ty, out),
        other => Err(format!("cannot bind {} to {}[]", other.type_name(), member.name()).into()),
    }
}

fn write_text(s: &str, out: &mut BytesMut) -> EncodeResult {
    out.put_slice(s.as_bytes());
    Ok(IsNull::No)
}
