//! RLS-scoped transactions.
//!
//! Every statement against a project database runs through [`run_scoped`]:
//!
//! ```text
//! acquire -> BEGIN -> SET LOCAL statement_timeout -> SET LOCAL ROLE
//!         -> set_config(request.jwt.claim.*) -> caller logic -> COMMIT
//! ```
//!
//! Any failure after `BEGIN` rolls back. Caller logic never runs unless the
//! role switch and claim injection both succeeded.

use futures::future::BoxFuture;
use restgate_core::ident::{is_valid_identifier, quote};
use restgate_core::{SessionClaims, SessionConfig};
use sqlx::{Connection, PgConnection, PgPool, Postgres, Transaction};
use std::time::Duration;

use crate::error::RlsError;

/// Settings applied to one scoped transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Database role for `SET LOCAL ROLE`.
    pub role: String,
    pub statement_timeout: Duration,
    /// Bound on the exact-count query of a read.
    pub count_timeout: Duration,
}

impl SessionSettings {
    /// Settings for a caller, picking the role from configuration.
    pub fn for_caller(config: &SessionConfig, claims: &SessionClaims) -> Self {
        Self {
            role: config.effective_role(claims).to_string(),
            statement_timeout: config.statement_timeout(),
            count_timeout: config.count_timeout(),
        }
    }
}

/// `SET LOCAL statement_timeout` statement for `timeout`.
pub(crate) fn statement_timeout_sql(timeout: Duration) -> String {
    format!("SET LOCAL statement_timeout = {}", timeout.as_millis())
}

/// `SET LOCAL ROLE` statement; the role must pass the identifier pattern.
pub(crate) fn set_role_sql(role: &str) -> Result<String, RlsError> {
    if !is_valid_identifier(role) {
        return Err(RlsError::InvalidRole);
    }
    let quoted = quote(role).map_err(|_| RlsError::InvalidRole)?;
    Ok(format!("SET LOCAL ROLE {}", quoted))
}

const SET_CLAIMS_SQL: &str = "SELECT \
    set_config('request.jwt.claim.sub', $1, true), \
    set_config('request.jwt.claim.role', $2, true), \
    set_config('request.jwt.claim.email', $3, true), \
    set_config('request.jwt.claims', $4, true)";

/// Run `f` inside a transaction scoped to `claims`.
///
/// `pool` is `None` when the project has no registered pool. The connection
/// returns to the pool when this function exits, on every path.
pub async fn run_scoped<T, E, F>(
    pool: Option<&PgPool>,
    settings: &SessionSettings,
    claims: &SessionClaims,
    f: F,
) -> Result<T, E>
where
    F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T, E>>,
    E: From<RlsError>,
{
    let set_role = set_role_sql(&settings.role)?;
    let pool = pool.ok_or(RlsError::ProjectUnreachable)?;
    let mut conn = pool.acquire().await.map_err(RlsError::from_acquire)?;

    let mut tx = conn.begin().await.map_err(RlsError::from)?;

    if let Err(err) = establish(&mut tx, settings, &set_role, claims).await {
        rollback(tx).await;
        return Err(err.into());
    }

    match f(&mut *tx).await {
        Ok(value) => {
            tx.commit().await.map_err(RlsError::from)?;
            Ok(value)
        }
        Err(err) => {
            rollback(tx).await;
            Err(err)
        }
    }
}

async fn establish(
    tx: &mut Transaction<'_, Postgres>,
    settings: &SessionSettings,
    set_role: &str,
    claims: &SessionClaims,
) -> Result<(), RlsError> {
    sqlx::query(&statement_timeout_sql(settings.statement_timeout))
        .execute(&mut **tx)
        .await?;

    // Kept apart from the parameterized claims statement.
    sqlx::query(set_role).execute(&mut **tx).await?;

    sqlx::query(SET_CLAIMS_SQL)
        .bind(&claims.subject)
        .bind(&claims.role)
        .bind(&claims.email)
        .bind(claims.to_json().to_string())
        .execute(&mut **tx)
        .await?;

    tracing::debug!(
        role = %settings.role,
        sub = %claims.subject,
        timeout_ms = settings.statement_timeout.as_millis() as u64,
        "Session scoped"
    );
    Ok(())
}

async fn rollback(tx: Transaction<'_, Postgres>) {
    if let Err(err) = tx.rollback().await {
        tracing::warn!(error = %err, "Rollback failed; connection will be discarded");
    }
}
