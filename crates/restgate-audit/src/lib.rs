//! # restgate-audit
//!
//! Delivery of [`SecurityEvent`]s produced when column governance strips a
//! field from a write.
//!
//! Events are sent fire-and-forget: [`SecurityAuditor::emit`] spawns a task
//! and returns immediately, and a failing sink only produces a log line.
//!
//! ## Backends
//!
//! | Backend | Output |
//! |---------|--------|
//! | `console` | JSON lines on stdout |
//! | `file` | JSON lines appended to `audit.file_path` |
//! | `database` | Rows in `audit.table`, via its own pool |
//! | `null` | Discarded |
//!
//! [`MemorySink`] keeps events in memory for tests.

pub mod auditor;
pub mod error;
pub mod sink;

pub use auditor::SecurityAuditor;
pub use error::AuditError;
pub use restgate_core::SecurityEvent;
pub use sink::{ConsoleSink, DatabaseSink, FileSink, MemorySink, NullSink, SecuritySink};
