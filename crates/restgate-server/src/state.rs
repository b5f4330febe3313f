//! Shared application state.

use restgate_audit::SecurityAuditor;
use restgate_compiler::QueryCompiler;
use restgate_core::{RestgateConfig, SessionConfig};
use restgate_rls::PoolRegistry;
use std::sync::Arc;

/// Shared, read-only state for every request.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pools: PoolRegistry,
    compiler: QueryCompiler,
    session: SessionConfig,
    auditor: SecurityAuditor,
}

impl AppState {
    /// Build pools, compiler and audit sink from the loaded configuration.
    pub fn from_config(config: &RestgateConfig) -> anyhow::Result<Self> {
        let pools = PoolRegistry::from_projects(&config.projects)?;
        let auditor = SecurityAuditor::from_config(&config.audit)?;
        Ok(Self::from_parts(
            pools,
            QueryCompiler::new(config.compiler.clone()),
            config.session.clone(),
            auditor,
        ))
    }

    pub fn from_parts(
        pools: PoolRegistry,
        compiler: QueryCompiler,
        session: SessionConfig,
        auditor: SecurityAuditor,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                pools,
                compiler,
                session,
                auditor,
            }),
        }
    }

    pub fn pools(&self) -> &PoolRegistry {
        &self.inner.pools
    }

    pub fn compiler(&self) -> &QueryCompiler {
        &self.inner.compiler
    }

    pub fn session(&self) -> &SessionConfig {
        &self.inner.session
    }

    pub fn auditor(&self) -> &SecurityAuditor {
        &self.inner.auditor
    }
}
