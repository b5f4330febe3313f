//! REST handlers.
//!
//! Every request follows the same path: caller headers, compile, hand the
//! security events to the auditor, then run the statement in an RLS-scoped
//! transaction and shape the response.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{Extensions, HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use restgate_compiler::{Compiled, CompiledQuery, Method, Page, RestRequest};
use restgate_rls::{QueryOutcome, SessionSettings, execute, run_scoped};
use serde_json::{Value, json};
use std::net::SocketAddr;

use crate::error::ApiError;
use crate::headers::{CallerContext, rest_headers};
use crate::state::AppState;

type QueryPairs = Query<Vec<(String, String)>>;

pub async fn healthz() -> Json<Value> {
    Json(json!({ "ok": true, "service": "restgate" }))
}

pub async fn read(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(query): QueryPairs,
    headers: HeaderMap,
    extensions: Extensions,
) -> Result<Response, ApiError> {
    handle(state, Method::Get, &table, &query, &headers, &extensions, &[]).await
}

pub async fn create(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(query): QueryPairs,
    headers: HeaderMap,
    extensions: Extensions,
    body: Bytes,
) -> Result<Response, ApiError> {
    handle(state, Method::Post, &table, &query, &headers, &extensions, &body).await
}

pub async fn update(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(query): QueryPairs,
    headers: HeaderMap,
    extensions: Extensions,
    body: Bytes,
) -> Result<Response, ApiError> {
    handle(state, Method::Patch, &table, &query, &headers, &extensions, &body).await
}

pub async fn remove(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(query): QueryPairs,
    headers: HeaderMap,
    extensions: Extensions,
) -> Result<Response, ApiError> {
    handle(state, Method::Delete, &table, &query, &headers, &extensions, &[]).await
}

async fn handle(
    state: AppState,
    method: Method,
    table: &str,
    query: &[(String, String)],
    headers: &HeaderMap,
    extensions: &Extensions,
    body: &[u8],
) -> Result<Response, ApiError> {
    let peer = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let caller = CallerContext::from_headers(headers, peer)?;
    let body = parse_body(body)?;
    let rest = rest_headers(headers);

    let Compiled {
        query: compiled,
        security_events,
        page,
    } = state.compiler().compile(
        &RestRequest {
            table,
            method,
            query,
            body: body.as_ref(),
            headers: &rest,
        },
        &caller.governance(),
    )?;

    // Delivery is detached from the request.
    drop(state.auditor().emit(security_events));

    let returns_rows = compiled.returns_rows;
    let outcome = execute_scoped(&state, &caller, compiled).await?;

    tracing::debug!(
        project = %caller.project_id,
        table = table,
        method = %method,
        rows = outcome.rows_affected,
        "Request complete"
    );

    Ok(respond(method, outcome, page, returns_rows, caller.singular))
}

/// Run `compiled` in the caller's RLS scope.
///
/// The single-object check runs inside the transaction, so a write that
/// touches any other number of rows is rolled back.
async fn execute_scoped(
    state: &AppState,
    caller: &CallerContext,
    compiled: CompiledQuery,
) -> Result<QueryOutcome, ApiError> {
    let settings = SessionSettings::for_caller(state.session(), &caller.claims);
    let statement_timeout = settings.statement_timeout;
    let count_timeout = settings.count_timeout;
    let singular = caller.singular;

    run_scoped(
        state.pools().get(&caller.project_id),
        &settings,
        &caller.claims,
        move |conn| {
            async move {
                let outcome = execute(conn, &compiled, statement_timeout, count_timeout).await?;
                check_singular(singular, compiled.returns_rows, &outcome)?;
                Ok::<_, ApiError>(outcome)
            }
            .boxed()
        },
    )
    .await
}

fn check_singular(
    singular: bool,
    returns_rows: bool,
    outcome: &QueryOutcome,
) -> Result<(), ApiError> {
    if singular && returns_rows && outcome.rows.len() != 1 {
        return Err(ApiError::NotSingular {
            rows: outcome.rows.len(),
        });
    }
    Ok(())
}

/// An empty body is no body.
fn parse_body(body: &[u8]) -> Result<Option<Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| ApiError::InvalidJson(e.to_string()))
}

fn respond(
    method: Method,
    outcome: QueryOutcome,
    page: Option<Page>,
    returns_rows: bool,
    singular: bool,
) -> Response {
    if !returns_rows {
        return StatusCode::NO_CONTENT.into_response();
    }

    let status = if method == Method::Post {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let row_count = outcome.rows.len();

    // Row count already checked by `check_singular`.
    let body = if singular {
        outcome.rows.into_iter().next().unwrap_or(Value::Null)
    } else {
        Value::Array(outcome.rows)
    };
    let mut response = (status, Json(body)).into_response();

    if let Some(page) = page {
        let range = page.content_range(row_count as u64, outcome.total);
        if let Ok(value) = HeaderValue::from_str(&range) {
            response.headers_mut().insert(header::CONTENT_RANGE, value);
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(rows: Vec<Value>, total: Option<u64>) -> QueryOutcome {
        QueryOutcome {
            rows_affected: rows.len() as u64,
            rows,
            total,
        }
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(b"").unwrap(), None);
        assert_eq!(parse_body(b"  \n").unwrap(), None);
        assert_eq!(parse_body(br#"{"a":1}"#).unwrap(), Some(json!({"a": 1})));
        assert!(matches!(parse_body(b"{"), Err(ApiError::InvalidJson(_))));
    }

    #[test]
    fn test_read_sets_content_range() {
        let page = Page {
            offset: 10,
            limit: Some(5),
        };
        let response = respond(
            Method::Get,
            outcome(vec![json!({"id": 11}), json!({"id": 12})], Some(40)),
            Some(page),
            true,
            false,
        );

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "10-11/40");
    }

    #[test]
    fn test_unknown_total() {
        let response = respond(
            Method::Get,
            outcome(vec![], None),
            Some(Page::default()),
            true,
            false,
        );
        assert_eq!(response.headers()[header::CONTENT_RANGE], "*/*");
    }

    #[test]
    fn test_write_statuses() {
        let created = respond(
            Method::Post,
            outcome(vec![json!({"id": 1})], None),
            None,
            true,
            false,
        );
        assert_eq!(created.status(), StatusCode::CREATED);
        assert!(created.headers().get(header::CONTENT_RANGE).is_none());

        let minimal = respond(Method::Patch, outcome(vec![], None), None, false, false);
        assert_eq!(minimal.status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_singular_requires_one_row() {
        let two = outcome(vec![json!({"id": 1}), json!({"id": 2})], None);
        assert!(matches!(
            check_singular(true, true, &two),
            Err(ApiError::NotSingular { rows: 2 })
        ));
        assert!(matches!(
            check_singular(true, true, &outcome(vec![], None)),
            Err(ApiError::NotSingular { rows: 0 })
        ));
        assert!(check_singular(false, true, &two).is_ok());
        assert!(check_singular(true, false, &outcome(vec![], None)).is_ok());

        let one = outcome(vec![json!({"id": 1})], None);
        assert!(check_singular(true, true, &one).is_ok());
        let response = respond(Method::Get, one, Some(Page::default()), true, true);
        assert_eq!(response.status(), StatusCode::OK);
    }

    /// Needs `DATABASE_URL`; returns early without it.
    #[tokio::test]
    async fn test_singular_mismatch_rolls_back_write() {
        use restgate_audit::SecurityAuditor;
        use restgate_compiler::{QueryCompiler, RequestHeaders};
        use restgate_core::SessionConfig;
        use restgate_rls::PoolRegistry;

        const ROLE: &str = "restgate_server_it";
        const SCHEMA: &str = "rg_server_it";

        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("skipping: DATABASE_URL not set");
            return;
        };
        let Ok(pool) = sqlx::PgPool::connect(&url).await else {
            eprintln!("skipping: cannot connect");
            return;
        };
        let setup = format!(
            r#"
            DO $$ BEGIN
                IF NOT EXISTS (SELECT 1 FROM pg_roles WHERE rolname = '{role}') THEN
                    CREATE ROLE {role} NOLOGIN;
                END IF;
            END $$;
            DROP SCHEMA IF EXISTS {schema} CASCADE;
            CREATE SCHEMA {schema};
            GRANT USAGE ON SCHEMA {schema} TO {role};
            CREATE TABLE {schema}.items (id int PRIMARY KEY, label text NOT NULL);
            GRANT SELECT, UPDATE ON {schema}.items TO {role};
            INSERT INTO {schema}.items VALUES (1, 'a'), (2, 'a');
            "#,
            role = ROLE,
            schema = SCHEMA
        );
        if let Err(e) = sqlx::raw_sql(&setup).execute(&pool).await {
            eprintln!("skipping: setup failed: {}", e);
            return;
        }

        let mut pools = PoolRegistry::new();
        pools.insert("it", pool.clone());
        let state = AppState::from_parts(
            pools,
            QueryCompiler::default(),
            SessionConfig {
                role: ROLE.to_string(),
                ..Default::default()
            },
            SecurityAuditor::disabled(),
        );

        let mut headers = HeaderMap::new();
        headers.insert("x-project-id", HeaderValue::from_static("it"));
        headers.insert(
            "accept",
            HeaderValue::from_static("application/vnd.pgrst.object+json"),
        );
        let caller = CallerContext::from_headers(&headers, None).unwrap();

        let query = vec![("label".to_string(), "eq.a".to_string())];
        let body = json!({"label": "b"});
        let rest = RequestHeaders::from_pairs([
            ("Content-Profile", SCHEMA),
            ("Prefer", "return=representation"),
        ]);
        let compiled = state
            .compiler()
            .compile(
                &RestRequest {
                    table: "items",
                    method: Method::Patch,
                    query: &query,
                    body: Some(&body),
                    headers: &rest,
                },
                &caller.governance(),
            )
            .unwrap();

        let err = execute_scoped(&state, &caller, compiled.query)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotSingular { rows: 2 }));

        let changed: i64 = sqlx::query_scalar(&format!(
            "SELECT count(*) FROM {}.items WHERE label = 'b'",
            SCHEMA
        ))
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(changed, 0);

        let _ = sqlx::raw_sql(&format!("DROP SCHEMA {} CASCADE", SCHEMA))
            .execute(&pool)
            .await;
    }
}
