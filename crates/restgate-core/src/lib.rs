//! # restgate-core
//!
//! Types shared by every Restgate crate:
//!
//! - [`ident`]: the identifier allow-list and quoting rules
//! - [`SessionClaims`]: the caller identity injected into each transaction
//! - [`LockLevel`] / [`LockMap`]: per-column write governance levels
//! - [`SqlValue`] / [`Row`] / [`MutationPayload`]: typed request bodies
//! - [`SecurityEvent`]: the record emitted when governance strips a field
//! - [`config`]: the `restgate.yaml` configuration tree

pub mod claims;
pub mod config;
pub mod ident;
pub mod lock;
pub mod security;
pub mod value;

pub use claims::SessionClaims;
pub use config::{
    AuditBackend, AuditConfig, CompilerConfig, ConfigError, PoolConfig, RestgateConfig,
    ServerConfig, SessionConfig, UpstreamConfig,
};
pub use ident::{IdentError, is_valid_identifier, qualified, quote};
pub use lock::{LockLevel, LockMap, SERVICE_ROLE, WriteOperation};
pub use security::SecurityEvent;
pub use value::{MutationPayload, PayloadError, Row, SqlValue};
