//! Execution of compiled queries on a scoped connection.
//!
//! Query-string values arrive as text, but sqlx sends every parameter in
//! binary with a concrete type. Each statement is therefore described first,
//! and every value is converted to the type Postgres inferred for its
//! placeholder before binding.

use restgate_compiler::CompiledQuery;
use restgate_core::SqlValue;
use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::{Arguments, Either, Executor, PgConnection, Row, Statement, TypeInfo};
use std::time::Duration;

use crate::coerce::{PgParam, coerce};
use crate::error::RlsError;
use crate::session::statement_timeout_sql;

const COUNT_SAVEPOINT: &str = "restgate_count";

/// Result of running one compiled query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutcome {
    /// One JSON object per returned row.
    pub rows: Vec<Value>,
    /// Rows touched by the statement (or returned, for reads).
    pub rows_affected: u64,
    /// Exact total from the paired count query. `None` when no count was
    /// requested or the count timed out.
    pub total: Option<u64>,
}

/// Wrap a row-producing statement so each row decodes as one JSON object.
pub fn json_rows_sql(sql: &str) -> String {
    format!("WITH _rg AS ({}) SELECT to_jsonb(_rg) AS row FROM _rg", sql)
}

/// Run `query` on a connection already scoped by
/// [`run_scoped`](crate::session::run_scoped).
///
/// The count (if any) runs first, under `count_timeout`, inside a savepoint
/// so a cancelled count does not abort the transaction. The main statement
/// then runs under `statement_timeout`.
pub async fn execute(
    conn: &mut PgConnection,
    query: &CompiledQuery,
    statement_timeout: Duration,
    count_timeout: Duration,
) -> Result<QueryOutcome, RlsError> {
    let total = match &query.count_text {
        Some(count_sql) => {
            let total = count_rows(conn, count_sql, &query.parameters, count_timeout).await?;
            sqlx::query(&statement_timeout_sql(statement_timeout))
                .execute(&mut *conn)
                .await?;
            total
        }
        None => None,
    };

    tracing::debug!(
        statement = query.prepared_statement_key.as_deref().unwrap_or("-"),
        params = query.parameters.len(),
        "Executing compiled query"
    );

    if query.returns_rows {
        let sql = json_rows_sql(&query.text);
        let args = bind_arguments(conn, &sql, &query.parameters).await?;
        let rows = sqlx::query_with(&sql, args).fetch_all(&mut *conn).await?;
        let rows = rows
            .iter()
            .map(|row| row.try_get::<Value, _>("row"))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(QueryOutcome {
            rows_affected: rows.len() as u64,
            rows,
            total,
        })
    } else {
        let args = bind_arguments(conn, &query.text, &query.parameters).await?;
        let done = sqlx::query_with(&query.text, args).execute(&mut *conn).await?;
        Ok(QueryOutcome {
            rows: Vec::new(),
            rows_affected: done.rows_affected(),
            total,
        })
    }
}

async fn count_rows(
    conn: &mut PgConnection,
    sql: &str,
    params: &[SqlValue],
    timeout: Duration,
) -> Result<Option<u64>, RlsError> {
    sqlx::query(&format!("SAVEPOINT {}", COUNT_SAVEPOINT))
        .execute(&mut *conn)
        .await?;
    sqlx::query(&statement_timeout_sql(timeout))
        .execute(&mut *conn)
        .await?;

    let counted = match bind_arguments(conn, sql, params).await {
        Ok(args) => sqlx::query_scalar_with::<_, i64, _>(sql, args)
            .fetch_one(&mut *conn)
            .await
            .map_err(RlsError::from),
        Err(err) => Err(err),
    };

    match counted {
        Ok(total) => {
            sqlx::query(&format!("RELEASE SAVEPOINT {}", COUNT_SAVEPOINT))
                .execute(&mut *conn)
                .await?;
            Ok(Some(total.max(0) as u64))
        }
        Err(RlsError::Database(err)) => {
            tracing::warn!(error = %err, "Exact count failed; total reported as unknown");
            sqlx::query(&format!("ROLLBACK TO SAVEPOINT {}", COUNT_SAVEPOINT))
                .execute(&mut *conn)
                .await?;
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Describe `sql` and convert `params` to the inferred parameter types.
async fn bind_arguments(
    conn: &mut PgConnection,
    sql: &str,
    params: &[SqlValue],
) -> Result<PgArguments, RlsError> {
    let types: Vec<String> = if params.is_empty() {
        Vec::new()
    } else {
        let statement = (&mut *conn).prepare(sql).await?;
        match statement.parameters() {
            Some(Either::Left(types)) => types.iter().map(|t| t.name().to_string()).collect(),
            _ => Vec::new(),
        }
    };

    let mut args = PgArguments::default();
    for (i, value) in params.iter().enumerate() {
        let type_name = types.get(i).map(String::as_str).unwrap_or("TEXT");
        let param = coerce(type_name, value).map_err(|_| RlsError::InvalidParameter {
            index: i + 1,
            expected: type_name.to_ascii_lowercase(),
        })?;
        add_param(&mut args, param).map_err(|_| RlsError::InvalidParameter {
            index: i + 1,
            expected: type_name.to_ascii_lowercase(),
        })?;
    }
    Ok(args)
}

fn add_param(args: &mut PgArguments, param: PgParam) -> Result<(), sqlx::error::BoxDynError> {
    match param {
        PgParam::Bool(v) => args.add(v),
        PgParam::Int2(v) => args.add(v),
        PgParam::Int4(v) => args.add(v),
        PgParam::Int8(v) => args.add(v),
        PgParam::Float4(v) => args.add(v),
        PgParam::Float8(v) => args.add(v),
        PgParam::Numeric(v) => args.add(v),
        PgParam::Text(v) => args.add(v),
        PgParam::Uuid(v) => args.add(v),
        PgParam::Json(v) => args.add(v.map(sqlx::types::Json)),
        PgParam::Date(v) => args.add(v),
        PgParam::Timestamp(v) => args.add(v),
        PgParam::Timestamptz(v) => args.add(v),
        PgParam::BoolArray(v) => args.add(v),
        PgParam::Int2Array(v) => args.add(v),
        PgParam::Int4Array(v) => args.add(v),
        PgParam::Int8Array(v) => args.add(v),
        PgParam::Float4Array(v) => args.add(v),
        PgParam::Float8Array(v) => args.add(v),
        PgParam::NumericArray(v) => args.add(v),
        PgParam::TextArray(v) => args.add(v),
        PgParam::UuidArray(v) => args.add(v),
        PgParam::DateArray(v) => args.add(v),
        PgParam::TimestampArray(v) => args.add(v),
        PgParam::TimestamptzArray(v) => args.add(v),
    }
}
