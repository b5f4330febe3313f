//! Conversion of request values to Postgres parameter types.

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use restgate_core::SqlValue;
use serde_json::Value;
use std::str::FromStr;
use uuid::Uuid;

/// A value converted to a concrete Postgres type, ready to bind.
#[derive(Debug, Clone, PartialEq)]
pub enum PgParam {
    Bool(Option<bool>),
    Int2(Option<i16>),
    Int4(Option<i32>),
    Int8(Option<i64>),
    Float4(Option<f32>),
    Float8(Option<f64>),
    Numeric(Option<BigDecimal>),
    Text(Option<String>),
    Uuid(Option<Uuid>),
    Json(Option<Value>),
    Date(Option<NaiveDate>),
    Timestamp(Option<NaiveDateTime>),
    Timestamptz(Option<DateTime<Utc>>),
    BoolArray(Option<Vec<bool>>),
    Int2Array(Option<Vec<i16>>),
    Int4Array(Option<Vec<i32>>),
    Int8Array(Option<Vec<i64>>),
    Float4Array(Option<Vec<f32>>),
    Float8Array(Option<Vec<f64>>),
    NumericArray(Option<Vec<BigDecimal>>),
    TextArray(Option<Vec<String>>),
    UuidArray(Option<Vec<Uuid>>),
    DateArray(Option<Vec<NaiveDate>>),
    TimestampArray(Option<Vec<NaiveDateTime>>),
    TimestamptzArray(Option<Vec<DateTime<Utc>>>),
}

/// The value does not parse as the requested type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoerceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    Text,
    Uuid,
    Json,
    Date,
    Timestamp,
    Timestamptz,
}

impl Kind {
    /// Map a sqlx type name (`INT4`, `TEXT[]`, ...) to a kind.
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "BOOL" => Some(Self::Bool),
            "INT2" => Some(Self::Int2),
            "INT4" => Some(Self::Int4),
            "INT8" => Some(Self::Int8),
            "FLOAT4" => Some(Self::Float4),
            "FLOAT8" => Some(Self::Float8),
            "NUMERIC" => Some(Self::Numeric),
            "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" | "UNKNOWN" => Some(Self::Text),
            "UUID" => Some(Self::Uuid),
            "JSON" | "JSONB" => Some(Self::Json),
            "DATE" => Some(Self::Date),
            "TIMESTAMP" => Some(Self::Timestamp),
            "TIMESTAMPTZ" => Some(Self::Timestamptz),
            _ => None,
        }
    }
}

/// Convert `value` for a parameter Postgres typed as `type_name`.
///
/// Types without a conversion (enums, domains, ranges, ...) are bound as
/// text; Postgres reports any mismatch itself.
pub fn coerce(type_name: &str, value: &SqlValue) -> Result<PgParam, CoerceError> {
    let upper = type_name.to_ascii_uppercase();
    let (element, is_array) = match upper.strip_suffix("[]") {
        Some(element) => (element, true),
        None => (upper.as_str(), false),
    };

    let Some(kind) = Kind::from_name(element) else {
        return Ok(PgParam::Text(as_text(value)));
    };

    if is_array {
        return Ok(match kind {
            Kind::Bool => PgParam::BoolArray(array(value, as_bool)?),
            Kind::Int2 => PgParam::Int2Array(array(value, as_int)?),
            Kind::Int4 => PgParam::Int4Array(array(value, as_int)?),
            Kind::Int8 => PgParam::Int8Array(array(value, as_int)?),
            Kind::Float4 => PgParam::Float4Array(array(value, |v| as_f64(v).map(|f| f as f32))?),
            Kind::Float8 => PgParam::Float8Array(array(value, as_f64)?),
            Kind::Numeric => PgParam::NumericArray(array(value, as_decimal)?),
            Kind::Text => PgParam::TextArray(array(value, as_text)?),
            Kind::Uuid => PgParam::UuidArray(array(value, as_uuid)?),
            Kind::Date => PgParam::DateArray(array(value, as_date)?),
            Kind::Timestamp => PgParam::TimestampArray(array(value, as_timestamp)?),
            Kind::Timestamptz => PgParam::TimestamptzArray(array(value, as_timestamptz)?),
            // json[] is rare enough to leave to the text fallback.
            Kind::Json => PgParam::Text(as_text(value)),
        });
    }

    Ok(match kind {
        Kind::Bool => PgParam::Bool(scalar(value, as_bool)?),
        Kind::Int2 => PgParam::Int2(scalar(value, as_int)?),
        Kind::Int4 => PgParam::Int4(scalar(value, as_int)?),
        Kind::Int8 => PgParam::Int8(scalar(value, as_int)?),
        Kind::Float4 => PgParam::Float4(scalar(value, |v| as_f64(v).map(|f| f as f32))?),
        Kind::Float8 => PgParam::Float8(scalar(value, as_f64)?),
        Kind::Numeric => PgParam::Numeric(scalar(value, as_decimal)?),
        Kind::Text => PgParam::Text(as_text(value)),
        Kind::Uuid => PgParam::Uuid(scalar(value, as_uuid)?),
        Kind::Json => PgParam::Json(scalar(value, as_json)?),
        Kind::Date => PgParam::Date(scalar(value, as_date)?),
        Kind::Timestamp => PgParam::Timestamp(scalar(value, as_timestamp)?),
        Kind::Timestamptz => PgParam::Timestamptz(scalar(value, as_timestamptz)?),
    })
}

fn scalar<T>(value: &SqlValue, f: impl Fn(&SqlValue) -> Option<T>) -> Result<Option<T>, CoerceError> {
    match value {
        SqlValue::Null => Ok(None),
        other => f(other).map(Some).ok_or(CoerceError),
    }
}

fn array<T>(
    value: &SqlValue,
    f: impl Fn(&SqlValue) -> Option<T>,
) -> Result<Option<Vec<T>>, CoerceError> {
    if *value == SqlValue::Null {
        return Ok(None);
    }
    let items = elements(value).ok_or(CoerceError)?;
    items
        .iter()
        .map(|item| f(item).ok_or(CoerceError))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// Array elements of an `in.(...)` list, a JSON array, or a `{a,b}` literal.
fn elements(value: &SqlValue) -> Option<Vec<SqlValue>> {
    match value {
        SqlValue::TextArray(items) => Some(items.iter().map(SqlValue::text).collect()),
        SqlValue::Json(Value::Array(items)) => {
            Some(items.iter().cloned().map(SqlValue::from).collect())
        }
        SqlValue::Text(s) => {
            let inner = s.trim().strip_prefix('{')?.strip_suffix('}')?;
            if inner.trim().is_empty() {
                return Some(Vec::new());
            }
            Some(
                inner
                    .split(',')
                    .map(|item| {
                        let item = item.trim();
                        let item = item
                            .strip_prefix('"')
                            .and_then(|i| i.strip_suffix('"'))
                            .unwrap_or(item);
                        SqlValue::text(item)
                    })
                    .collect(),
            )
        }
        _ => None,
    }
}

fn as_text(value: &SqlValue) -> Option<String> {
    match value {
        SqlValue::Null => None,
        other => Some(other.to_audit_text()),
    }
}

fn as_bool(value: &SqlValue) -> Option<bool> {
    match value {
        SqlValue::Bool(b) => Some(*b),
        SqlValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
            "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_int<T: TryFrom<i64>>(value: &SqlValue) -> Option<T> {
    let n = match value {
        SqlValue::Number(n) => n.as_i64()?,
        SqlValue::Text(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    T::try_from(n).ok()
}

fn as_f64(value: &SqlValue) -> Option<f64> {
    match value {
        SqlValue::Number(n) => n.as_f64(),
        SqlValue::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_decimal(value: &SqlValue) -> Option<BigDecimal> {
    match value {
        SqlValue::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        SqlValue::Text(s) => BigDecimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn as_uuid(value: &SqlValue) -> Option<Uuid> {
    match value {
        SqlValue::Text(s) => Uuid::parse_str(s.trim()).ok(),
        _ => None,
    }
}

fn as_json(value: &SqlValue) -> Option<Value> {
    Some(match value {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => Value::Bool(*b),
        SqlValue::Number(n) => Value::Number(n.clone()),
        // Query-string operands hold JSON text; body strings are JSON strings.
        SqlValue::Text(s) => serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone())),
        SqlValue::Json(v) => v.clone(),
        SqlValue::TextArray(items) => Value::from(items.clone()),
    })
}

fn as_date(value: &SqlValue) -> Option<NaiveDate> {
    match value {
        SqlValue::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
        _ => None,
    }
}

fn as_timestamp(value: &SqlValue) -> Option<NaiveDateTime> {
    let SqlValue::Text(s) = value else {
        return None;
    };
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))
        .or_else(|| as_date(value).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

fn as_timestamptz(value: &SqlValue) -> Option<DateTime<Utc>> {
    let SqlValue::Text(s) = value else {
        return None;
    };
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| as_timestamp(value).map(|naive| naive.and_utc()))
}
