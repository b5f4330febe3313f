//! Error types for the RLS crate.

use thiserror::Error;

/// SQLSTATE for `invalid_catalog_name` (database does not exist).
const INVALID_CATALOG_NAME: &str = "3D000";

/// Errors raised while setting up or running a scoped transaction.
#[derive(Debug, Error)]
pub enum RlsError {
    /// No pool is registered for the project, or its database cannot be reached.
    #[error("project database is unreachable")]
    ProjectUnreachable,

    /// The project's database does not exist.
    #[error("project database not found")]
    ProjectNotFound,

    /// The configured database role is not a valid identifier.
    #[error("invalid database role")]
    InvalidRole,

    /// A value could not be converted to the parameter type Postgres inferred.
    #[error("parameter ${index} is not a valid {expected}")]
    InvalidParameter { index: usize, expected: String },

    /// A project pool could not be built from configuration.
    #[error("invalid project configuration: {0}")]
    Config(String),

    /// Native database error, passed through untouched.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl RlsError {
    /// Classify a pool acquisition failure.
    pub fn from_acquire(err: sqlx::Error) -> Self {
        let missing_database = err
            .as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| code == INVALID_CATALOG_NAME);

        if missing_database {
            tracing::warn!(error = %err, "Project database does not exist");
            Self::ProjectNotFound
        } else {
            tracing::warn!(error = %err, "Failed to acquire project connection");
            Self::ProjectUnreachable
        }
    }

    /// The native database error, if this is one.
    pub fn database_error(&self) -> Option<&(dyn sqlx::error::DatabaseError + 'static)> {
        match self {
            Self::Database(err) => err.as_database_error(),
            _ => None,
        }
    }

    /// SQLSTATE of a native database error.
    pub fn sqlstate(&self) -> Option<String> {
        self.database_error()
            .and_then(|db| db.code())
            .map(|code| code.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_acquire_errors_are_unreachable() {
        assert!(matches!(
            RlsError::from_acquire(sqlx::Error::PoolTimedOut),
            RlsError::ProjectUnreachable
        ));
        assert!(matches!(
            RlsError::from_acquire(sqlx::Error::PoolClosed),
            RlsError::ProjectUnreachable
        ));
    }

    #[test]
    fn test_sqlstate_absent_for_setup_errors() {
        assert_eq!(RlsError::InvalidRole.sqlstate(), None);
        assert!(RlsError::ProjectNotFound.database_error().is_none());
    }
}
