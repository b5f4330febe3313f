//! Security event sinks.

use async_trait::async_trait;
use restgate_core::{SecurityEvent, quote};
use sqlx::PgPool;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::AuditError;

/// Destination for security events.
#[async_trait]
pub trait SecuritySink: Send + Sync {
    /// Record a batch of events from one request.
    async fn record(&self, events: &[SecurityEvent]) -> Result<(), AuditError>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}

/// JSON lines on stdout.
pub struct ConsoleSink;

#[async_trait]
impl SecuritySink for ConsoleSink {
    async fn record(&self, events: &[SecurityEvent]) -> Result<(), AuditError> {
        for event in events {
            println!("{}", serde_json::to_string(event)?);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

/// JSON lines appended to a file.
pub struct FileSink {
    path: PathBuf,
    // Serializes appends so concurrent batches do not interleave lines.
    write_lock: Mutex<()>,
}

impl FileSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SecuritySink for FileSink {
    async fn record(&self, events: &[SecurityEvent]) -> Result<(), AuditError> {
        let mut buf = String::new();
        for event in events {
            buf.push_str(&serde_json::to_string(event)?);
            buf.push('\n');
        }

        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| AuditError::Storage(format!("file sink lock poisoned: {}", e)))?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(buf.as_bytes())?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// Rows inserted into a Postgres table through a dedicated pool.
///
/// The table is created on the first batch if it does not exist.
pub struct DatabaseSink {
    pool: PgPool,
    table: String,
    table_ready: AtomicBool,
}

impl DatabaseSink {
    /// `table` is quoted here; an empty name is rejected.
    pub fn new(pool: PgPool, table: &str) -> Result<Self, AuditError> {
        let table = quote(table).map_err(|e| AuditError::InitializationFailed(e.to_string()))?;
        Ok(Self {
            pool,
            table,
            table_ready: AtomicBool::new(false),
        })
    }

    /// Create the events table if it does not exist.
    pub async fn ensure_table(&self) -> Result<(), AuditError> {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                event_id uuid PRIMARY KEY,
                occurred_at timestamptz NOT NULL,
                project_id text NOT NULL,
                table_name text NOT NULL,
                column_name text NOT NULL,
                attempted_value text NOT NULL,
                source_ip text,
                operation text NOT NULL,
                lock_level text NOT NULL,
                caller_role text NOT NULL
            )",
            self.table
        );
        sqlx::query(&ddl).execute(&self.pool).await?;
        self.table_ready.store(true, Ordering::Release);
        Ok(())
    }

    fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (event_id, occurred_at, project_id, table_name, column_name, \
             attempted_value, source_ip, operation, lock_level, caller_role) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            self.table
        )
    }
}

#[async_trait]
impl SecuritySink for DatabaseSink {
    async fn record(&self, events: &[SecurityEvent]) -> Result<(), AuditError> {
        if !self.table_ready.load(Ordering::Acquire) {
            self.ensure_table().await?;
        }
        let sql = self.insert_sql();
        let mut tx = self.pool.begin().await?;
        for event in events {
            sqlx::query(&sql)
                .bind(event.event_id)
                .bind(event.occurred_at)
                .bind(&event.project_id)
                .bind(&event.table_name)
                .bind(&event.column_name)
                .bind(&event.attempted_value)
                .bind(event.source_ip.as_deref())
                .bind(event.operation.to_string())
                .bind(event.lock_level.to_string())
                .bind(&event.caller_role)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "database"
    }
}

/// Discards events.
pub struct NullSink;

#[async_trait]
impl SecuritySink for NullSink {
    async fn record(&self, _events: &[SecurityEvent]) -> Result<(), AuditError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "null"
    }
}

/// Keeps events in memory. Useful for tests and embedding.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<SecurityEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SecuritySink for MemorySink {
    async fn record(&self, events: &[SecurityEvent]) -> Result<(), AuditError> {
        let mut stored = self
            .events
            .lock()
            .map_err(|e| AuditError::Storage(format!("memory sink lock poisoned: {}", e)))?;
        stored.extend_from_slice(events);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restgate_core::{LockLevel, WriteOperation};

    fn event(column: &str) -> SecurityEvent {
        SecurityEvent::new("proj_1", "todos", column, "x")
            .operation(WriteOperation::Update)
            .lock_level(LockLevel::Immutable)
            .caller_role("authenticated")
    }

    #[tokio::test]
    async fn test_console_sink() {
        ConsoleSink.record(&[event("id")]).await.unwrap();
    }

    #[tokio::test]
    async fn test_file_sink_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("events.log"));

        sink.record(&[event("id"), event("owner_id")]).await.unwrap();
        sink.record(&[event("plan")]).await.unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);

        let parsed: SecurityEvent = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(parsed.column_name, "plan");
        assert_eq!(parsed.operation, WriteOperation::Update);
    }

    #[tokio::test]
    async fn test_memory_sink() {
        let sink = MemorySink::new();
        sink.record(&[event("a")]).await.unwrap();
        sink.record(&[event("b")]).await.unwrap();
        let columns: Vec<_> = sink.events().into_iter().map(|e| e.column_name).collect();
        assert_eq!(columns, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_database_sink_quotes_table() {
        // connect_lazy does not touch the network.
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/restgate")
            .unwrap();
        let sink = DatabaseSink::new(pool, "security_events").unwrap();
        assert!(sink.insert_sql().starts_with("INSERT INTO \"security_events\" ("));
    }
}
