//! Request-to-SQL compilation.

use restgate_core::ident::{is_valid_identifier, qualified, quote};
use restgate_core::{
    CompilerConfig, LockLevel, MutationPayload, PayloadError, Row, SecurityEvent, SqlValue,
    WriteOperation,
};
use restgate_policy::{GovernanceContext, apply_locks};
use sha2::{Digest, Sha256};

use crate::error::CompileError;
use crate::filter::parse_filter;
use crate::order::order_clause;
use crate::prefer::Resolution;
use crate::range::Page;
use crate::request::{Method, RestRequest};
use crate::select::select_list;

/// Conflict target used when `on_conflict` is absent.
const DEFAULT_CONFLICT_COLUMN: &str = "id";

/// A parameterized statement ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub text: String,
    pub parameters: Vec<SqlValue>,
    /// Plan-cache hint, present only when there are parameters.
    pub prepared_statement_key: Option<String>,
    /// Paired `SELECT COUNT(*)` for reads with `Prefer: count=exact`.
    /// Uses the same parameters as `text`.
    pub count_text: Option<String>,
    /// Whether the statement produces rows (`SELECT` or `RETURNING`).
    pub returns_rows: bool,
}

impl CompiledQuery {
    fn new(text: String, parameters: Vec<SqlValue>, returns_rows: bool) -> Self {
        let prepared_statement_key =
            (!parameters.is_empty()).then(|| prepared_statement_key(&text));
        Self {
            text,
            parameters,
            prepared_statement_key,
            count_text: None,
            returns_rows,
        }
    }
}

/// Compilation output: the statement plus what governance recorded.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub query: CompiledQuery,
    /// One event per stripped field, to hand to the audit sink.
    pub security_events: Vec<SecurityEvent>,
    /// Pagination of a read, used for `Content-Range`.
    pub page: Option<Page>,
}

/// Deterministic statement name for `text`: `rg_` plus 32 hex digits of its
/// SHA-256.
pub fn prepared_statement_key(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let hex: String = digest[..16].iter().map(|b| format!("{:02x}", b)).collect();
    format!("rg_{}", hex)
}

/// Compiles REST requests into parameterized SQL.
#[derive(Debug, Clone, Default)]
pub struct QueryCompiler {
    config: CompilerConfig,
}

impl QueryCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    /// Compile one request. Governance inputs come from `ctx`.
    pub fn compile(
        &self,
        request: &RestRequest<'_>,
        ctx: &GovernanceContext,
    ) -> Result<Compiled, CompileError> {
        if !is_valid_identifier(request.table) {
            return Err(CompileError::InvalidTable);
        }
        let target = self.target(request)?;

        let compiled = match request.method {
            Method::Get => self.compile_read(request, &target)?,
            Method::Post => compile_insert(request, &target, ctx)?,
            Method::Patch => compile_update(request, &target, ctx)?,
            Method::Delete => compile_delete(request, &target)?,
        };

        tracing::debug!(
            table = request.table,
            method = %request.method,
            sql = %compiled.query.text,
            params = compiled.query.parameters.len(),
            statement = compiled.query.prepared_statement_key.as_deref().unwrap_or("-"),
            stripped = compiled.security_events.len(),
            "Compiled request"
        );

        Ok(compiled)
    }

    /// Quoted, optionally schema-qualified target table.
    fn target(&self, request: &RestRequest<'_>) -> Result<String, CompileError> {
        let profile = if request.method.is_read() {
            request.headers.accept_profile.as_deref()
        } else {
            request.headers.content_profile.as_deref()
        };
        let schema = profile
            .filter(|p| !p.is_empty())
            .or(self.config.default_schema.as_deref());

        if let Some(schema) = schema {
            if !is_valid_identifier(schema) {
                return Err(CompileError::InvalidIdentifier("schema".into()));
            }
        }
        Ok(qualified(schema, request.table)?)
    }

    fn compile_read(
        &self,
        request: &RestRequest<'_>,
        target: &str,
    ) -> Result<Compiled, CompileError> {
        let columns = select_list(request.param("select"))?;
        let filters = Filters::collect(request, 1);
        let where_sql = filters.sql();
        let page = Page::resolve(
            request.headers.range.as_deref(),
            request.param("limit"),
            request.param("offset"),
            self.config.max_rows,
        );

        let text = format!(
            "SELECT {} FROM {}{}{}{}",
            columns,
            target,
            where_sql,
            order_clause(request.param("order")),
            page.sql()
        );

        let mut query = CompiledQuery::new(text, filters.params, true);
        if request.headers.prefer.count_exact {
            query.count_text = Some(format!("SELECT COUNT(*) FROM {}{}", target, where_sql));
        }

        Ok(Compiled {
            query,
            security_events: Vec::new(),
            page: Some(page),
        })
    }
}

fn compile_insert(
    request: &RestRequest<'_>,
    target: &str,
    ctx: &GovernanceContext,
) -> Result<Compiled, CompileError> {
    let body = request.body.ok_or(CompileError::EmptyPayload)?;
    let rows = MutationPayload::from_json(body)?.into_rows();
    if rows.is_empty() {
        return Err(CompileError::EmptyPayload);
    }

    let governed = apply_locks(rows, request.table, WriteOperation::Insert, ctx);
    let mut rows = governed.rows;

    if let Some(raw) = request.param("columns") {
        let allowed = identifier_list(raw, "columns")?;
        for row in &mut rows {
            row.retain(|column, _| allowed.iter().any(|a| a == column));
        }
    }

    let columns = column_union(&rows);
    if columns.is_empty() {
        return Err(CompileError::EmptyPayload);
    }
    if rows.iter().any(|row| row.len() != columns.len()) {
        return Err(CompileError::NonUniformBatch);
    }

    let mut params = Vec::with_capacity(rows.len() * columns.len());
    let mut groups = Vec::with_capacity(rows.len());
    for row in rows {
        let mut placeholders = Vec::with_capacity(columns.len());
        for column in &columns {
            params.push(row.get(column).cloned().unwrap_or(SqlValue::Null));
            placeholders.push(format!("${}", params.len()));
        }
        groups.push(format!("({})", placeholders.join(", ")));
    }

    let column_sql = quote_all(&columns)?.join(", ");
    let mut text = format!(
        "INSERT INTO {} ({}) VALUES {}",
        target,
        column_sql,
        groups.join(", ")
    );
    text.push_str(&conflict_clause(request, &columns, ctx)?);

    let prefer = &request.headers.prefer;
    let returning = !prefer.wants_minimal();
    if returning {
        text.push_str(" RETURNING *");
    }

    Ok(Compiled {
        query: CompiledQuery::new(text, params, returning),
        security_events: governed.events,
        page: None,
    })
}

fn conflict_clause(
    request: &RestRequest<'_>,
    columns: &[String],
    ctx: &GovernanceContext,
) -> Result<String, CompileError> {
    match request.headers.prefer.resolution {
        None => Ok(String::new()),
        Some(Resolution::IgnoreDuplicates) => Ok(" ON CONFLICT DO NOTHING".to_string()),
        Some(Resolution::MergeDuplicates) => {
            let target = match request.param("on_conflict") {
                Some(raw) => identifier_list(raw, "on_conflict")?,
                None => vec![DEFAULT_CONFLICT_COLUMN.to_string()],
            };
            let target = quote_all(&target)?.join(", ");

            let updates = columns
                .iter()
                .filter(|column| ctx.locks.level(column) != LockLevel::InsertOnly)
                .map(|column| {
                    let quoted = quote(column)?;
                    Ok(format!("{} = EXCLUDED.{}", quoted, quoted))
                })
                .collect::<Result<Vec<_>, CompileError>>()?;

            if updates.is_empty() {
                Ok(format!(" ON CONFLICT ({}) DO NOTHING", target))
            } else {
                Ok(format!(
                    " ON CONFLICT ({}) DO UPDATE SET {}",
                    target,
                    updates.join(", ")
                ))
            }
        }
    }
}

fn compile_update(
    request: &RestRequest<'_>,
    target: &str,
    ctx: &GovernanceContext,
) -> Result<Compiled, CompileError> {
    let row = match request.body {
        Some(body) => match MutationPayload::from_json(body)? {
            MutationPayload::Single(row) => row,
            MutationPayload::Batch(_) => {
                return Err(CompileError::InvalidPayload(PayloadError::NotAnObject));
            }
        },
        None => Row::new(),
    };

    let governed = apply_locks(vec![row], request.table, WriteOperation::Update, ctx);
    let row = governed.rows.into_iter().next().unwrap_or_default();

    let filters = Filters::collect(request, row.len() + 1);
    if filters.is_empty() {
        return Err(CompileError::MissingFilter {
            method: request.method,
        });
    }
    if row.is_empty() {
        return Err(CompileError::EmptyPayload);
    }

    let mut params = Vec::with_capacity(row.len() + filters.params.len());
    let mut assignments = Vec::with_capacity(row.len());
    for (column, value) in row.iter() {
        params.push(value.clone());
        assignments.push(format!("{} = ${}", quote(column)?, params.len()));
    }
    let where_sql = filters.sql();
    params.extend(filters.params);

    let mut text = format!("UPDATE {} SET {}{}", target, assignments.join(", "), where_sql);
    let returning = request.headers.prefer.wants_representation();
    if returning {
        text.push_str(" RETURNING *");
    }

    Ok(Compiled {
        query: CompiledQuery::new(text, params, returning),
        security_events: governed.events,
        page: None,
    })
}

fn compile_delete(request: &RestRequest<'_>, target: &str) -> Result<Compiled, CompileError> {
    let filters = Filters::collect(request, 1);
    if filters.is_empty() {
        return Err(CompileError::MissingFilter {
            method: request.method,
        });
    }

    let mut text = format!("DELETE FROM {}{}", target, filters.sql());
    let returning = request.headers.prefer.wants_representation();
    if returning {
        text.push_str(" RETURNING *");
    }

    Ok(Compiled {
        query: CompiledQuery::new(text, filters.params, returning),
        security_events: Vec::new(),
        page: None,
    })
}

/// WHERE predicates with their bound values.
struct Filters {
    clauses: Vec<String>,
    params: Vec<SqlValue>,
}

impl Filters {
    /// Parse every filter key, numbering placeholders from `first_param`.
    fn collect(request: &RestRequest<'_>, first_param: usize) -> Self {
        let mut clauses = Vec::new();
        let mut params = Vec::new();
        for (column, raw) in request.filters() {
            let Some(predicate) = parse_filter(column, raw, first_param + params.len()) else {
                continue;
            };
            if predicate.is_empty() {
                continue;
            }
            if let Some(value) = predicate.value {
                params.push(value);
            }
            clauses.push(predicate.sql);
        }
        Self { clauses, params }
    }

    fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// Columns across all rows, in first-seen order.
fn column_union(rows: &[Row]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for column in row.columns() {
            if !columns.iter().any(|c| c == column) {
                columns.push(column.to_string());
            }
        }
    }
    columns
}

fn identifier_list(raw: &str, key: &str) -> Result<Vec<String>, CompileError> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            if is_valid_identifier(name) {
                Ok(name.to_string())
            } else {
                Err(CompileError::InvalidIdentifier(key.to_string()))
            }
        })
        .collect()
}

fn quote_all(columns: &[String]) -> Result<Vec<String>, CompileError> {
    columns
        .iter()
        .map(|c| quote(c).map_err(CompileError::from))
        .collect()
}
