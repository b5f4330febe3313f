//! Lock evaluation over mutation payloads.

use restgate_core::{LockLevel, LockMap, Row, SERVICE_ROLE, SecurityEvent, WriteOperation};

/// Per-request governance inputs.
///
/// Threaded explicitly through compilation; nothing here is read from shared
/// state.
#[derive(Debug, Clone, Default)]
pub struct GovernanceContext {
    /// Lock levels for the target table.
    pub locks: LockMap,
    /// Role the caller acts as (`service_role` bypasses `service_role_only`).
    pub caller_role: String,
    /// Project the request targets, recorded on security events.
    pub project_id: String,
    /// Caller address, recorded on security events.
    pub source_ip: Option<String>,
}

impl GovernanceContext {
    pub fn new(locks: LockMap, caller_role: impl Into<String>) -> Self {
        Self {
            locks,
            caller_role: caller_role.into(),
            ..Default::default()
        }
    }

    pub fn project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = project_id.into();
        self
    }

    pub fn source_ip(mut self, ip: impl Into<String>) -> Self {
        self.source_ip = Some(ip.into());
        self
    }
}

/// Rows after governance, plus one event per stripped field.
#[derive(Debug, Clone, Default)]
pub struct Governed {
    pub rows: Vec<Row>,
    pub events: Vec<SecurityEvent>,
}

/// Whether a column at `level` is removed for this operation and role.
pub fn is_stripped(level: LockLevel, operation: WriteOperation, caller_role: &str) -> bool {
    match level {
        LockLevel::Unlocked => false,
        LockLevel::Immutable => true,
        LockLevel::InsertOnly => operation == WriteOperation::Update,
        LockLevel::ServiceRoleOnly => caller_role != SERVICE_ROLE,
    }
}

/// Strip locked fields from every row.
///
/// Rows are processed independently; a poisoned field only loses that field.
pub fn apply_locks(
    rows: Vec<Row>,
    table: &str,
    operation: WriteOperation,
    ctx: &GovernanceContext,
) -> Governed {
    if ctx.locks.is_empty() {
        return Governed {
            rows,
            events: Vec::new(),
        };
    }

    let mut events = Vec::new();
    let rows = rows
        .into_iter()
        .map(|mut row| {
            let locked: Vec<(String, LockLevel)> = row
                .columns()
                .map(|column| (column, ctx.locks.level(column)))
                .filter(|(_, level)| is_stripped(*level, operation, &ctx.caller_role))
                .map(|(column, level)| (column.to_string(), level))
                .collect();

            for (column, level) in locked {
                let Some(value) = row.remove(&column) else {
                    continue;
                };
                tracing::warn!(
                    project = %ctx.project_id,
                    table = table,
                    column = %column,
                    lock = %level,
                    operation = %operation,
                    role = %ctx.caller_role,
                    "Stripped locked column from write"
                );
                events.push(
                    SecurityEvent::new(&ctx.project_id, table, &column, value.to_audit_text())
                        .source_ip(ctx.source_ip.clone())
                        .operation(operation)
                        .lock_level(level)
                        .caller_role(&ctx.caller_role),
                );
            }
            row
        })
        .collect();

    Governed { rows, events }
}
