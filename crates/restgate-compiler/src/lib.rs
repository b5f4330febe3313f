//! # restgate-compiler
//!
//! Turns a REST request (method, table, query string, body, headers) into a
//! single parameterized Postgres statement.
//!
//! ## How It Works
//!
//! **Request:**
//! ```text
//! GET /todos?done=is.false&priority=gte.3&order=created_at.desc&limit=10
//! ```
//!
//! **Compiled:**
//! ```sql
//! SELECT * FROM "todos" WHERE "done" IS FALSE AND "priority" >= $1 ORDER BY "created_at" DESC LIMIT 10
//! -- parameters: ["3"]
//! ```
//!
//! Values from the query string or body only ever appear as `$n`
//! placeholders. Identifiers are validated against `^[a-zA-Z0-9_]+$` and
//! double-quoted; filter keys that fail validation are dropped silently so
//! attacker-controlled names are never reflected in errors.
//!
//! ## Supported Operations
//!
//! | Method | Statement | Notes |
//! |--------|-----------|-------|
//! | `GET` | `SELECT` | `select`, `order`, `limit`/`offset`, `Range`, `Prefer: count=exact` |
//! | `POST` | `INSERT` | batches, `on_conflict`, `Prefer: resolution=…`, `return=minimal` |
//! | `PATCH` | `UPDATE` | requires a filter, `Prefer: return=representation` |
//! | `DELETE` | `DELETE` | requires a filter |

pub mod compiler;
pub mod error;
pub mod filter;
pub mod order;
pub mod prefer;
pub mod range;
pub mod request;
pub mod select;

pub use compiler::{Compiled, CompiledQuery, QueryCompiler, prepared_statement_key};
pub use error::CompileError;
pub use filter::{FilterClause, FilterOperator, Predicate, parse_filter};
pub use prefer::{Prefer, Resolution, ReturnPreference};
pub use range::Page;
pub use request::{Method, RESERVED_KEYS, RequestHeaders, RestRequest};
pub use restgate_core::ident;
