use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Login,
    LoginFailed,
    Logout,
    PasswordChanged,
    PasswordReset,
    ForceDisconnect,
    Create,
    Update,
    Delete,
    Deactivate,
    BulkCreate,
    BackupCreate,
    BackupRestore,
    SessionKick,
    SessionKickAll,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Login => "LOGIN",
            AuditAction::LoginFailed => "LOGIN_FAILED",
            AuditAction::Logout => "LOGOUT",
            AuditAction::PasswordChanged => "PASSWORD_CHANGED",
            AuditAction::PasswordReset => "PASSWORD_RESET",
            AuditAction::ForceDisconnect => "FORCE_DISCONNECT",
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::Deactivate => "DEACTIVATE",
            AuditAction::BulkCreate => "BULK_CREATE",
            AuditAction::BackupCreate => "BACKUP_CREATE",
            AuditAction::BackupRestore => "BACKUP_RESTORE",
            AuditAction::SessionKick => "SESSION_KICK",
            AuditAction::SessionKickAll => "SESSION_KICK_ALL",
        }
    }
}

/// Append-only audit trail entry. Never mutated or deleted once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub username: String,
    pub session_id: Option<String>,
    pub action: AuditAction,
    pub entity_kind: Option<String>,
    pub entity_id: Option<i64>,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub client_ip: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One row per completed HTTP call; independent of the domain transaction
/// for the same request, used only for operational stats / retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: i64,
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub username: Option<String>,
    pub client_ip: Option<String>,
    pub status_code: i64,
    pub response_time_ms: i64,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}
