//! Per-project connection pools.

use restgate_core::UpstreamConfig;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::collections::HashMap;

use crate::error::RlsError;

/// Maps project ids to their pools.
///
/// Built once at startup and only read afterwards. Pools connect lazily, so
/// an unreachable project surfaces on the first request, not at boot.
#[derive(Debug, Clone, Default)]
pub struct PoolRegistry {
    pools: HashMap<String, PgPool>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a lazy pool for every configured project.
    pub fn from_projects<'a>(
        projects: impl IntoIterator<Item = (&'a String, &'a UpstreamConfig)>,
    ) -> Result<Self, RlsError> {
        let mut registry = Self::new();
        for (id, upstream) in projects {
            let pool = PgPoolOptions::new()
                .min_connections(upstream.pool.min_connections)
                .max_connections(upstream.pool.max_connections)
                .acquire_timeout(upstream.pool.acquire_timeout())
                .idle_timeout(Some(upstream.pool.idle_timeout()))
                .connect_lazy(&upstream.connection_string())
                .map_err(|e| RlsError::Config(format!("project {}: {}", id, e)))?;

            tracing::info!(
                project = %id,
                max_connections = upstream.pool.max_connections,
                "Registered project pool"
            );
            registry.insert(id.clone(), pool);
        }
        Ok(registry)
    }

    pub fn insert(&mut self, project_id: impl Into<String>, pool: PgPool) {
        self.pools.insert(project_id.into(), pool);
    }

    pub fn get(&self, project_id: &str) -> Option<&PgPool> {
        self.pools.get(project_id)
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Close every pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        for pool in self.pools.values() {
            pool.close().await;
        }
    }
}
