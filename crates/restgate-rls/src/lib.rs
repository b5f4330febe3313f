//! # restgate-rls
//!
//! The only crate that touches project databases.
//!
//! - [`PoolRegistry`]: one lazily connected `PgPool` per project
//! - [`run_scoped`]: a transaction carrying the caller's role and claims,
//!   committed on success and rolled back on any failure
//! - [`execute`]: runs a [`CompiledQuery`](restgate_compiler::CompiledQuery)
//!   on a scoped connection, binding every value with the type Postgres
//!   inferred for its placeholder
//!
//! ## Example
//!
//! ```rust,no_run
//! use futures::FutureExt;
//! use restgate_core::{SessionClaims, SessionConfig};
//! use restgate_rls::{RlsError, SessionSettings, run_scoped};
//!
//! # async fn example(pool: sqlx::PgPool) -> Result<(), RlsError> {
//! let claims = SessionClaims::new("u1", "authenticated", "a@b.com");
//! let settings = SessionSettings::for_caller(&SessionConfig::default(), &claims);
//!
//! let visible: i64 = run_scoped(Some(&pool), &settings, &claims, |conn| {
//!     async move {
//!         let n = sqlx::query_scalar("SELECT count(*) FROM todos")
//!             .fetch_one(conn)
//!             .await?;
//!         Ok::<_, RlsError>(n)
//!     }
//!     .boxed()
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod coerce;
pub mod error;
pub mod executor;
pub mod pool;
pub mod session;

pub use coerce::{CoerceError, PgParam, coerce};
pub use error::RlsError;
pub use executor::{QueryOutcome, execute, json_rows_sql};
pub use pool::PoolRegistry;
pub use session::{SessionSettings, run_scoped};
