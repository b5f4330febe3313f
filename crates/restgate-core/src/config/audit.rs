//! Security audit configuration.

use serde::{Deserialize, Serialize};

/// Where security events are delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Whether security events are recorded at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Storage backend.
    #[serde(default)]
    pub backend: AuditBackend,

    /// File path (for the file backend).
    #[serde(default = "default_file_path")]
    pub file_path: String,

    /// Table name (for the database backend).
    #[serde(default = "default_table")]
    pub table: String,

    /// Environment variable holding the audit database URL (database backend).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url_env: Option<String>,
}

/// Storage backend type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuditBackend {
    /// JSON lines on stdout.
    #[default]
    Console,
    /// JSON lines appended to a file.
    File,
    /// Rows inserted into a Postgres table.
    Database,
    /// Discard events.
    Null,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            backend: AuditBackend::default(),
            file_path: default_file_path(),
            table: default_table(),
            database_url_env: None,
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_file_path() -> String {
    "security-events.log".to_string()
}

fn default_table() -> String {
    "security_events".to_string()
}
