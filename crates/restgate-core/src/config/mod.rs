//! Configuration types for Restgate.
//!
//! Everything is loaded from a single `restgate.yaml`:
//!
//! ```yaml
//! server:
//!   bind: 0.0.0.0:3000
//! projects:
//!   demo:
//!     database_url_env: DEMO_DATABASE_URL
//! session:
//!   role: authenticated
//!   statement_timeout_ms: 8000
//! audit:
//!   backend: file
//!   file_path: security-events.log
//! ```

pub mod audit;
pub mod session;
pub mod upstream;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub use audit::{AuditBackend, AuditConfig};
pub use session::{CompilerConfig, ServerConfig, SessionConfig};
pub use upstream::{PoolConfig, UpstreamConfig};

use crate::ident::is_valid_identifier;

/// Complete Restgate configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestgateConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream databases keyed by project id.
    #[serde(default)]
    pub projects: HashMap<String, UpstreamConfig>,

    /// Per-transaction session settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Query compiler settings.
    #[serde(default)]
    pub compiler: CompilerConfig,

    /// Security event audit settings.
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RestgateConfig {
    /// Load and validate configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would otherwise be written into SQL text.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for role in std::iter::once(&self.session.role).chain(&self.session.allowed_roles) {
            if !is_valid_identifier(role) {
                return Err(ConfigError::Config(format!(
                    "session role '{}' is not a valid identifier",
                    role
                )));
            }
        }
        if let Some(schema) = &self.compiler.default_schema
            && !is_valid_identifier(schema)
        {
            return Err(ConfigError::Config(format!(
                "default_schema '{}' is not a valid identifier",
                schema
            )));
        }
        if !is_valid_identifier(&self.audit.table) {
            return Err(ConfigError::Config(format!(
                "audit table '{}' is not a valid identifier",
                self.audit.table
            )));
        }
        if self.session.statement_timeout_ms == 0 || self.session.count_timeout_ms == 0 {
            return Err(ConfigError::Config(
                "statement timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Get a project's upstream configuration.
    pub fn project(&self, id: &str) -> Option<&UpstreamConfig> {
        self.projects.get(id)
    }
}
