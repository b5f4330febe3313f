//! Typed request values and mutation payloads.
//!
//! JSON bodies are converted into ordered [`Row`]s of [`SqlValue`] before any
//! governance or SQL assembly happens. Column names are validated here, so
//! nothing downstream ever sees an unchecked key.

use serde::Serialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::ident::is_valid_identifier;

/// A value bound to a statement parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    /// Nested objects and arrays from a JSON body.
    Json(Value),
    /// Element list of an `in.(...)` filter.
    TextArray(Vec<String>),
}

impl SqlValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Render the value as text for audit records.
    ///
    /// Strings are returned raw; everything else is serialized as JSON.
    pub fn to_audit_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::Json(v) => v.to_string(),
            Self::TextArray(items) => serde_json::to_string(items).unwrap_or_default(),
        }
    }
}

impl From<Value> for SqlValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::Text(s),
            other @ (Value::Array(_) | Value::Object(_)) => Self::Json(other),
        }
    }
}

/// Errors raised while converting a JSON body into rows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// Body is neither an object nor an array of objects.
    #[error("payload must be a JSON object or an array of JSON objects")]
    NotAnObject,

    /// A key failed the identifier pattern. The key itself is not reported.
    #[error("payload contains an invalid column name")]
    InvalidColumn,
}

/// One row of a mutation payload: column name to value, in body order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from a JSON object, validating every key.
    pub fn from_json_object(object: Map<String, Value>) -> Result<Self, PayloadError> {
        let mut row = Self::new();
        for (column, value) in object {
            if !is_valid_identifier(&column) {
                return Err(PayloadError::InvalidColumn);
            }
            row.columns.push((column, SqlValue::from(value)));
        }
        Ok(row)
    }

    /// Builder-style insert, replacing an existing value for `column`.
    pub fn with(mut self, column: impl Into<String>, value: SqlValue) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: SqlValue) {
        let column = column.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.columns.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn remove(&mut self, column: &str) -> Option<SqlValue> {
        let pos = self.columns.iter().position(|(name, _)| name == column)?;
        Some(self.columns.remove(pos).1)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str, &SqlValue) -> bool) {
        self.columns.retain(|(name, value)| keep(name, value));
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A write body: a single object or a batch of objects.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationPayload {
    Single(Row),
    Batch(Vec<Row>),
}

impl MutationPayload {
    /// Convert a JSON body, rejecting anything that is not an object or an
    /// array of objects.
    pub fn from_json(body: &Value) -> Result<Self, PayloadError> {
        match body {
            Value::Object(object) => Ok(Self::Single(Row::from_json_object(object.clone())?)),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Object(object) => Row::from_json_object(object.clone()),
                    _ => Err(PayloadError::NotAnObject),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Batch),
            _ => Err(PayloadError::NotAnObject),
        }
    }

    pub fn into_rows(self) -> Vec<Row> {
        match self {
            Self::Single(row) => vec![row],
            Self::Batch(rows) => rows,
        }
    }
}
