//! Request inputs handed to the compiler.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::prefer::Prefer;

/// Query-string keys with compiler meaning; every other key is a filter.
pub const RESERVED_KEYS: &[&str] = &["select", "order", "limit", "offset", "on_conflict", "columns"];

/// HTTP methods the compiler understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn is_read(self) -> bool {
        self == Self::Get
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Patch => write!(f, "PATCH"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(format!("unsupported method: {}", other)),
        }
    }
}

/// The request headers the compiler reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders {
    /// Raw `Range` header (`0-24`, `items=0-24`, `10-`).
    pub range: Option<String>,
    /// Merged `Prefer` directives.
    pub prefer: Prefer,
    /// `Accept-Profile`: schema for reads.
    pub accept_profile: Option<String>,
    /// `Content-Profile`: schema for writes.
    pub content_profile: Option<String>,
}

impl RequestHeaders {
    /// Collect headers from name/value pairs. Names are case-insensitive and
    /// repeated `Prefer` headers are merged.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut headers = Self::default();
        for (name, value) in pairs {
            match name.to_ascii_lowercase().as_str() {
                "range" => headers.range = Some(value.trim().to_string()),
                "prefer" => headers.prefer.merge(value),
                "accept-profile" => headers.accept_profile = Some(value.trim().to_string()),
                "content-profile" => headers.content_profile = Some(value.trim().to_string()),
                _ => {}
            }
        }
        headers
    }
}

/// One REST request against a table.
#[derive(Debug, Clone, Copy)]
pub struct RestRequest<'a> {
    pub table: &'a str,
    pub method: Method,
    /// Decoded query-string pairs, in request order.
    pub query: &'a [(String, String)],
    pub body: Option<&'a Value>,
    pub headers: &'a RequestHeaders,
}

impl<'a> RestRequest<'a> {
    /// Last value of a reserved key.
    pub fn param(&self, key: &str) -> Option<&'a str> {
        self.query
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Filter candidates: every non-reserved key, in request order.
    pub fn filters(&self) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.query
            .iter()
            .filter(|(k, _)| !RESERVED_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
