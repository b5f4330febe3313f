//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use restgate_compiler::CompileError;
use restgate_rls::RlsError;
use serde::Serialize;
use sqlx::postgres::{PgDatabaseError, PgErrorPosition};
use thiserror::Error;

/// Errors returned by the REST handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("x-project-id header is required")]
    MissingProjectId,

    #[error("request body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Rls(#[from] RlsError),

    /// A single object was requested but the result had another row count.
    #[error("JSON object requested, {rows} rows returned")]
    NotSingular { rows: usize },
}

/// JSON error body, shaped like a Postgres error report.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub hint: Option<String>,
    pub position: Option<usize>,
}

impl ErrorBody {
    fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            hint: None,
            position: None,
        }
    }
}

/// Status for a native database error, by SQLSTATE.
pub fn status_for_sqlstate(code: &str) -> StatusCode {
    match code {
        "42501" => StatusCode::FORBIDDEN,
        c if c.starts_with("23") => StatusCode::CONFLICT,
        c if c.starts_with("22") || c.starts_with("42") => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingProjectId | Self::InvalidJson(_) | Self::Compile(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotSingular { .. } => StatusCode::NOT_ACCEPTABLE,
            Self::Rls(err) => match err {
                RlsError::ProjectUnreachable => StatusCode::SERVICE_UNAVAILABLE,
                RlsError::ProjectNotFound => StatusCode::NOT_FOUND,
                RlsError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
                RlsError::InvalidRole | RlsError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
                RlsError::Database(_) => err
                    .sqlstate()
                    .map_or(StatusCode::INTERNAL_SERVER_ERROR, |code| {
                        status_for_sqlstate(&code)
                    }),
            },
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            Self::MissingProjectId => ErrorBody::new("missing_project_id", self.to_string()),
            Self::InvalidJson(_) => ErrorBody::new("invalid_json", self.to_string()),
            Self::Compile(err) => ErrorBody::new(err.code(), err.to_string()),
            Self::NotSingular { rows } => ErrorBody {
                details: Some(format!("The result contains {} rows", rows)),
                ..ErrorBody::new("not_singular", self.to_string())
            },
            Self::Rls(err) => rls_body(err),
        }
    }
}

fn rls_body(err: &RlsError) -> ErrorBody {
    let code = match err {
        RlsError::ProjectUnreachable => "project_unreachable",
        RlsError::ProjectNotFound => "project_not_found",
        RlsError::InvalidRole => "invalid_role",
        RlsError::InvalidParameter { .. } => "invalid_parameter",
        RlsError::Config(_) => "config",
        RlsError::Database(_) => {
            let Some(db) = err.database_error() else {
                return ErrorBody::new("internal", "database request failed");
            };
            let Some(pg) = db.try_downcast_ref::<PgDatabaseError>() else {
                return ErrorBody::new(
                    db.code().map(|c| c.into_owned()).unwrap_or_default(),
                    db.message(),
                );
            };
            return ErrorBody {
                code: pg.code().to_string(),
                message: pg.message().to_string(),
                details: pg.detail().map(str::to_string),
                hint: pg.hint().map(str::to_string),
                position: match pg.position() {
                    Some(PgErrorPosition::Original(position)) => Some(position),
                    Some(PgErrorPosition::Internal { position, .. }) => Some(position),
                    None => None,
                },
            };
        }
    };
    ErrorBody::new(code, err.to_string())
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}
