use serde::Serialize;

/// Structured trace events emitted alongside the durable audit log.
/// Text logs are a secondary, unstructured emission of the same events —
/// the `AuditRecord` table (see `models::audit`) is the source of truth.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    LoginSucceeded {
        username: String,
        session_id: String,
    },
    LoginFailed {
        username: String,
        reason: String,
    },
    AccountLocked {
        username: String,
        lockout_minutes: i64,
    },
    SessionExpiredSweep {
        swept: usize,
    },
    SnapshotCreated {
        filename: String,
        size_bytes: u64,
    },
    SnapshotRestored {
        filename: String,
        safety_copy: String,
    },
    ChangeBroadcast {
        entity: String,
        action: String,
        entity_id: Option<i64>,
        recipients: usize,
    },
    ClientEvicted {
        client_id: String,
        reason: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "fretcore_event");
    }
}
