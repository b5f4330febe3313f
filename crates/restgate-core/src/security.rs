//! Security events emitted by column governance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lock::{LockLevel, WriteOperation};

/// A field was stripped from a write because of its lock level.
///
/// Delivered fire-and-forget to an audit sink; never returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    /// Unique event ID.
    pub event_id: Uuid,

    /// When the field was stripped.
    pub occurred_at: DateTime<Utc>,

    pub project_id: String,
    pub table_name: String,
    pub column_name: String,

    /// The stripped value, serialized as text.
    pub attempted_value: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,

    pub operation: WriteOperation,
    pub lock_level: LockLevel,
    pub caller_role: String,
}

impl SecurityEvent {
    pub fn new(
        project_id: impl Into<String>,
        table_name: impl Into<String>,
        column_name: impl Into<String>,
        attempted_value: impl Into<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            project_id: project_id.into(),
            table_name: table_name.into(),
            column_name: column_name.into(),
            attempted_value: attempted_value.into(),
            source_ip: None,
            operation: WriteOperation::Insert,
            lock_level: LockLevel::Unlocked,
            caller_role: String::new(),
        }
    }

    pub fn source_ip(mut self, ip: Option<impl Into<String>>) -> Self {
        self.source_ip = ip.map(Into::into);
        self
    }

    pub fn operation(mut self, operation: WriteOperation) -> Self {
        self.operation = operation;
        self
    }

    pub fn lock_level(mut self, level: LockLevel) -> Self {
        self.lock_level = level;
        self
    }

    pub fn caller_role(mut self, role: impl Into<String>) -> Self {
        self.caller_role = role.into();
        self
    }

    /// One-line summary without the attempted value.
    pub fn summary(&self) -> String {
        format!(
            "[{} - {} - {}.{} - {}]",
            self.project_id, self.caller_role, self.table_name, self.column_name, self.lock_level
        )
    }
}
