//! Server, session and compiler settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::claims::SessionClaims;

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address, e.g. "0.0.0.0:3000".
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Settings applied to every RLS-scoped transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Least-privilege database role switched to with `SET LOCAL ROLE`.
    #[serde(default = "default_role")]
    pub role: String,

    /// Claim roles that may be used as the database role directly.
    /// Any other claim role falls back to `role`.
    #[serde(default)]
    pub allowed_roles: Vec<String>,

    /// `statement_timeout` for the transaction, in milliseconds.
    #[serde(default = "default_statement_timeout_ms")]
    pub statement_timeout_ms: u64,

    /// `statement_timeout` for the exact-count query, in milliseconds.
    #[serde(default = "default_count_timeout_ms")]
    pub count_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            role: default_role(),
            allowed_roles: Vec::new(),
            statement_timeout_ms: default_statement_timeout_ms(),
            count_timeout_ms: default_count_timeout_ms(),
        }
    }
}

impl SessionConfig {
    /// Database role for a caller.
    pub fn effective_role<'a>(&'a self, claims: &'a SessionClaims) -> &'a str {
        if self.allowed_roles.iter().any(|r| *r == claims.role) {
            &claims.role
        } else {
            &self.role
        }
    }

    pub fn statement_timeout(&self) -> Duration {
        Duration::from_millis(self.statement_timeout_ms)
    }

    pub fn count_timeout(&self) -> Duration {
        Duration::from_millis(self.count_timeout_ms)
    }
}

/// Query compiler configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Schema used to qualify tables when no profile header is sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_schema: Option<String>,

    /// Upper bound applied to every read's LIMIT.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rows: Option<u64>,
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_role() -> String {
    "authenticated".to_string()
}

fn default_statement_timeout_ms() -> u64 {
    8000
}

fn default_count_timeout_ms() -> u64 {
    2000
}
