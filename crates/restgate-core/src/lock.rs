//! Column lock levels ("padlocks").

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Role name that bypasses `service_role_only` locks.
pub const SERVICE_ROLE: &str = "service_role";

/// Write lock on a single column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockLevel {
    /// Never writable through the REST surface.
    Immutable,
    /// Writable on insert, stripped on update.
    InsertOnly,
    /// Writable only by the service role.
    ServiceRoleOnly,
    /// No restriction. Unknown level strings land here.
    #[default]
    #[serde(other)]
    Unlocked,
}

impl fmt::Display for LockLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlocked => write!(f, "unlocked"),
            Self::Immutable => write!(f, "immutable"),
            Self::InsertOnly => write!(f, "insert_only"),
            Self::ServiceRoleOnly => write!(f, "service_role_only"),
        }
    }
}

/// Kind of write a payload is destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteOperation {
    Insert,
    Update,
}

impl fmt::Display for WriteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
        }
    }
}

/// Lock levels keyed by column name.
///
/// Owned by whoever configures the table; the core only reads it. Columns
/// missing from the map are [`LockLevel::Unlocked`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockMap(HashMap<String, LockLevel>);

impl LockMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object such as `{"owner_id": "immutable"}`.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with(mut self, column: impl Into<String>, level: LockLevel) -> Self {
        self.0.insert(column.into(), level);
        self
    }

    /// Lock level for a column.
    pub fn level(&self, column: &str) -> LockLevel {
        self.0.get(column).copied().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|level| *level == LockLevel::Unlocked)
    }
}

impl<K: Into<String>> FromIterator<(K, LockLevel)> for LockMap {
    fn from_iter<I: IntoIterator<Item = (K, LockLevel)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_map_from_json() {
        let map = LockMap::from_json_str(
            r#"{"id":"immutable","created_by":"insert_only","plan":"service_role_only","name":"unlocked"}"#,
        )
        .unwrap();

        assert_eq!(map.level("id"), LockLevel::Immutable);
        assert_eq!(map.level("created_by"), LockLevel::InsertOnly);
        assert_eq!(map.level("plan"), LockLevel::ServiceRoleOnly);
        assert_eq!(map.level("name"), LockLevel::Unlocked);
        assert_eq!(map.level("missing"), LockLevel::Unlocked);
    }

    #[test]
    fn test_unknown_level_is_unlocked() {
        let map = LockMap::from_json_str(r#"{"title":"read_only_maybe"}"#).unwrap();
        assert_eq!(map.level("title"), LockLevel::Unlocked);
        assert!(map.is_empty());
    }

    #[test]
    fn test_level_names() {
        assert_eq!(LockLevel::default(), LockLevel::Unlocked);
        assert_eq!(
            serde_json::to_string(&LockLevel::Unlocked).unwrap(),
            r#""unlocked""#
        );
        assert_eq!(
            serde_json::from_str::<LockLevel>(r#""insert_only""#).unwrap(),
            LockLevel::InsertOnly
        );
    }
}
