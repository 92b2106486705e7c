use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use serde::Serialize;

use fretcore_domain::models::audit::{AuditAction, AuditRecord};
use fretcore_domain::Result;

use super::{map_db_err, Store};

fn action_str(a: AuditAction) -> &'static str {
    a.as_str()
}

fn parse_action(s: &str) -> AuditAction {
    match s {
        "LOGIN" => AuditAction::Login,
        "LOGIN_FAILED" => AuditAction::LoginFailed,
        "LOGOUT" => AuditAction::Logout,
        "PASSWORD_CHANGED" => AuditAction::PasswordChanged,
        "PASSWORD_RESET" => AuditAction::PasswordReset,
        "FORCE_DISCONNECT" => AuditAction::ForceDisconnect,
        "UPDATE" => AuditAction::Update,
        "DELETE" => AuditAction::Delete,
        "DEACTIVATE" => AuditAction::Deactivate,
        "BULK_CREATE" => AuditAction::BulkCreate,
        "BACKUP_CREATE" => AuditAction::BackupCreate,
        "BACKUP_RESTORE" => AuditAction::BackupRestore,
        "SESSION_KICK" => AuditAction::SessionKick,
        "SESSION_KICK_ALL" => AuditAction::SessionKickAll,
        _ => AuditAction::Create,
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<AuditRecord> {
    let action: String = row.get(3)?;
    let before: Option<String> = row.get(6)?;
    let after: Option<String> = row.get(7)?;
    Ok(AuditRecord {
        id: row.get(0)?,
        username: row.get(1)?,
        session_id: row.get(2)?,
        action: parse_action(&action),
        entity_kind: row.get(4)?,
        entity_id: row.get(5)?,
        before: before.and_then(|s| serde_json::from_str(&s).ok()),
        after: after.and_then(|s| serde_json::from_str(&s).ok()),
        client_ip: row.get(8)?,
        created_at: row.get(9)?,
    })
}

/// An append request; `id`/`created_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub username: String,
    pub session_id: Option<String>,
    pub action: AuditAction,
    pub entity_kind: Option<String>,
    pub entity_id: Option<i64>,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub client_ip: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Prefix-insensitive match on username.
    pub username_prefix: Option<String>,
    pub action: Option<AuditAction>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditPage {
    pub total: i64,
    pub items: Vec<AuditRecord>,
}

impl Store {
    /// Append-only: never exposes an update/delete path.
    pub fn append_audit(&self, entry: &AuditEntry) -> Result<AuditRecord> {
        let now = Utc::now();
        let before_json = entry.before.as_ref().map(|v| v.to_string());
        let after_json = entry.after.as_ref().map(|v| v.to_string());
        let conn = self.lock();
        conn.execute(
            "INSERT INTO audit_records (username, session_ref, action, entity_kind, entity_id, \
             before_json, after_json, client_ip, created_at) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
            params![
                entry.username,
                entry.session_id,
                action_str(entry.action),
                entry.entity_kind,
                entry.entity_id,
                before_json,
                after_json,
                entry.client_ip,
                now,
            ],
        )
        .map_err(map_db_err)?;
        let id = conn.last_insert_rowid();
        Ok(AuditRecord {
            id,
            username: entry.username.clone(),
            session_id: entry.session_id.clone(),
            action: entry.action,
            entity_kind: entry.entity_kind.clone(),
            entity_id: entry.entity_id,
            before: entry.before.clone(),
            after: entry.after.clone(),
            client_ip: entry.client_ip.clone(),
            created_at: now,
        })
    }

    pub fn query_audit(&self, filter: &AuditFilter) -> Result<AuditPage> {
        let conn = self.lock();
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(prefix) = &filter.username_prefix {
            where_sql.push_str(" AND username LIKE ?");
            args.push(Box::new(format!("{}%", prefix.to_uppercase())));
        }
        if let Some(action) = filter.action {
            where_sql.push_str(" AND action = ?");
            args.push(Box::new(action_str(action)));
        }
        if let Some(from) = filter.date_from {
            where_sql.push_str(" AND created_at >= ?");
            args.push(Box::new(from));
        }
        if let Some(to) = filter.date_to {
            where_sql.push_str(" AND created_at <= ?");
            args.push(Box::new(to));
        }

        let count_sql = format!("SELECT COUNT(*) FROM audit_records{where_sql}");
        let count_refs: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();
        let total: i64 = conn.query_row(&count_sql, count_refs.as_slice(), |r| r.get(0)).map_err(map_db_err)?;

        let mut sql = format!(
            "SELECT id, username, session_ref, action, entity_kind, entity_id, before_json, \
             after_json, client_ip, created_at FROM audit_records{where_sql} \
             ORDER BY created_at DESC LIMIT ? OFFSET ?"
        );
        let limit = if filter.limit > 0 { filter.limit } else { 100 };
        args.push(Box::new(limit));
        args.push(Box::new(filter.offset));
        let param_refs: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();
        let mut stmt = conn.prepare(&sql).map_err(map_db_err)?;
        let rows = stmt.query_map(param_refs.as_slice(), row_to_record).map_err(map_db_err)?;
        let items = rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_db_err)?;
        sql.clear();
        Ok(AuditPage { total, items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(username: &str, action: AuditAction) -> AuditEntry {
        AuditEntry {
            username: username.into(),
            session_id: None,
            action,
            entity_kind: Some("mission".into()),
            entity_id: Some(1),
            before: None,
            after: Some(serde_json::json!({"id": 1})),
            client_ip: None,
        }
    }

    #[test]
    fn ordering_is_newest_first() {
        let store = Store::open_in_memory().unwrap();
        store.append_audit(&entry("PLANNER1", AuditAction::Create)).unwrap();
        store.append_audit(&entry("PLANNER1", AuditAction::Update)).unwrap();
        let page = store.query_audit(&AuditFilter { limit: 10, ..Default::default() }).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].action.as_str(), "UPDATE");
    }

    #[test]
    fn username_prefix_filter_is_case_insensitive() {
        let store = Store::open_in_memory().unwrap();
        store.append_audit(&entry("PLANNER1", AuditAction::Create)).unwrap();
        store.append_audit(&entry("FINANCE1", AuditAction::Create)).unwrap();
        let page = store
            .query_audit(&AuditFilter {
                username_prefix: Some("plan".into()),
                limit: 10,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].username, "PLANNER1");
    }
}
