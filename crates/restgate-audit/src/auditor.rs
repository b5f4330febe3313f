//! Fire-and-forget dispatch of security events.

use restgate_core::{AuditBackend, AuditConfig, SecurityEvent};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::error::AuditError;
use crate::sink::{ConsoleSink, DatabaseSink, FileSink, NullSink, SecuritySink};

/// Hands security events to a sink without blocking the request.
///
/// Delivery happens on a spawned task. Failures are logged and dropped; the
/// request that produced the events never observes them.
#[derive(Clone)]
pub struct SecurityAuditor {
    sink: Arc<dyn SecuritySink>,
}

impl SecurityAuditor {
    /// Build the sink selected by `config`.
    ///
    /// The database backend connects lazily, so this never touches the
    /// network.
    pub fn from_config(config: &AuditConfig) -> Result<Self, AuditError> {
        if !config.enabled {
            return Ok(Self::disabled());
        }

        let sink: Arc<dyn SecuritySink> = match config.backend {
            AuditBackend::Console => Arc::new(ConsoleSink),
            AuditBackend::File => Arc::new(FileSink::new(&config.file_path)),
            AuditBackend::Null => Arc::new(NullSink),
            AuditBackend::Database => {
                let var = config.database_url_env.as_deref().ok_or_else(|| {
                    AuditError::InitializationFailed(
                        "audit.database_url_env is required for the database backend".into(),
                    )
                })?;
                let url = std::env::var(var).map_err(|_| {
                    AuditError::InitializationFailed(format!("environment variable {} not set", var))
                })?;
                let pool = PgPoolOptions::new().max_connections(2).connect_lazy(&url)?;
                Arc::new(DatabaseSink::new(pool, &config.table)?)
            }
        };

        tracing::info!(backend = sink.name(), "Security audit sink ready");
        Ok(Self { sink })
    }

    pub fn with_sink(sink: Arc<dyn SecuritySink>) -> Self {
        Self { sink }
    }

    /// An auditor that discards everything.
    pub fn disabled() -> Self {
        Self {
            sink: Arc::new(NullSink),
        }
    }

    /// Deliver `events` in the background.
    ///
    /// Returns the delivery task, or `None` when there was nothing to send.
    /// Callers on the request path drop the handle.
    pub fn emit(&self, events: Vec<SecurityEvent>) -> Option<JoinHandle<()>> {
        if events.is_empty() {
            return None;
        }

        for event in &events {
            tracing::debug!(event_id = %event.event_id, "Security event {}", event.summary());
        }

        let sink = Arc::clone(&self.sink);
        Some(tokio::spawn(async move {
            if let Err(e) = sink.record(&events).await {
                tracing::warn!(
                    sink = sink.name(),
                    count = events.len(),
                    error = %e,
                    "Failed to record security events"
                );
            }
        }))
    }
}

impl std::fmt::Debug for SecurityAuditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityAuditor")
            .field("sink", &self.sink.name())
            .finish()
    }
}
