use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::Serialize;

use fretcore_domain::Result;

use super::{map_db_err, Store};

/// Every user-data-bearing table, for the operational "table row counts"
/// dashboard panel.
const ROW_COUNT_TABLES: &[&str] = &[
    "users",
    "roles",
    "sessions",
    "routes",
    "drivers",
    "driver_unavailabilities",
    "subcontractors",
    "subcontractor_emails",
    "subcontractor_tariffs",
    "pallet_revenues",
    "missions",
    "audit_records",
    "request_records",
];

#[derive(Debug, Clone, Serialize)]
pub struct TableRowCount {
    pub table: String,
    pub rows: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserActivity {
    pub username: String,
    pub event_count: i64,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ActionBreakdown {
    pub action: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub username: String,
    pub total_actions: i64,
    pub breakdown: Vec<ActionBreakdown>,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardStats {
    pub missions_today: i64,
    pub missions_created_today: i64,
    pub missions_modified_today: i64,
    pub active_routes: i64,
    pub active_drivers: i64,
    pub user_count: i64,
    pub requests_today: i64,
    pub errors_today: i64,
    pub database_size_bytes: u64,
}

impl Store {
    pub fn table_row_counts(&self) -> Result<Vec<TableRowCount>> {
        let conn = self.lock();
        let mut out = Vec::with_capacity(ROW_COUNT_TABLES.len());
        for table in ROW_COUNT_TABLES {
            let sql = format!("SELECT COUNT(*) FROM {table}");
            let rows: i64 = conn.query_row(&sql, [], |r| r.get(0)).map_err(map_db_err)?;
            out.push(TableRowCount { table: table.to_string(), rows });
        }
        Ok(out)
    }

    /// Activity per user over the window starting at `since`, derived from
    /// the audit log (creates/updates/logins all land there).
    pub fn activity_per_user(&self, since: DateTime<Utc>) -> Result<Vec<UserActivity>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(
                "SELECT username, COUNT(*), MAX(created_at) FROM audit_records \
                 WHERE created_at >= ?1 GROUP BY username ORDER BY COUNT(*) DESC",
            )
            .map_err(map_db_err)?;
        let rows = stmt
            .query_map(params![since], |r| {
                Ok(UserActivity { username: r.get(0)?, event_count: r.get(1)?, last_activity: r.get(2)? })
            })
            .map_err(map_db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_db_err)
    }

    /// Totals, action breakdown, and last activity for a single user.
    pub fn user_stats(&self, username: &str) -> Result<UserStats> {
        use fretcore_domain::models::user::User;
        let normalized = User::normalize_username(username);
        let conn = self.lock();
        let total_actions: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM audit_records WHERE username = ?1",
                params![normalized],
                |r| r.get(0),
            )
            .map_err(map_db_err)?;
        let last_activity: Option<DateTime<Utc>> = conn
            .query_row(
                "SELECT MAX(created_at) FROM audit_records WHERE username = ?1",
                params![normalized],
                |r| r.get(0),
            )
            .map_err(map_db_err)?;
        let mut stmt = conn
            .prepare(
                "SELECT action, COUNT(*) FROM audit_records WHERE username = ?1 \
                 GROUP BY action ORDER BY COUNT(*) DESC",
            )
            .map_err(map_db_err)?;
        let rows = stmt
            .query_map(params![normalized], |r| {
                Ok(ActionBreakdown { action: r.get(0)?, count: r.get(1)? })
            })
            .map_err(map_db_err)?;
        let breakdown = rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_db_err)?;
        Ok(UserStats { username: normalized, total_actions, breakdown, last_activity })
    }

    /// Dashboard counts. `database_size_bytes` is filled in by the caller
    /// (the store has no notion of its own file path once opened).
    pub fn dashboard_stats(&self, today: chrono::NaiveDate) -> Result<DashboardStats> {
        let conn = self.lock();
        let today_str = today.to_string();
        let missions_today: i64 = conn
            .query_row("SELECT COUNT(*) FROM missions WHERE date = ?1", params![today_str], |r| r.get(0))
            .map_err(map_db_err)?;
        let missions_created_today: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM missions WHERE date(created_at) = ?1",
                params![today_str],
                |r| r.get(0),
            )
            .map_err(map_db_err)?;
        let missions_modified_today: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM missions WHERE date(updated_at) = ?1",
                params![today_str],
                |r| r.get(0),
            )
            .map_err(map_db_err)?;
        let active_routes: i64 = conn
            .query_row("SELECT COUNT(*) FROM routes WHERE is_active = 1", [], |r| r.get(0))
            .map_err(map_db_err)?;
        let active_drivers: i64 = conn
            .query_row("SELECT COUNT(*) FROM drivers WHERE is_active = 1", [], |r| r.get(0))
            .map_err(map_db_err)?;
        let user_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0)).map_err(map_db_err)?;
        drop(conn);

        let day_start = today.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let requests_today = self.requests_count_since(day_start)?;
        let errors_today = self.error_count_since(day_start)?;

        Ok(DashboardStats {
            missions_today,
            missions_created_today,
            missions_modified_today,
            active_routes,
            active_drivers,
            user_count,
            requests_today,
            errors_today,
            database_size_bytes: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::missions::MissionPatch;
    use fretcore_domain::capability::Capabilities;
    use fretcore_domain::models::audit::AuditAction;
    use fretcore_domain::models::mission::MissionKind;

    #[test]
    fn table_row_counts_reflects_inserts() {
        let store = Store::open_in_memory().unwrap();
        store.seed_role("viewer", "Viewer", Capabilities::none()).unwrap();
        let counts = store.table_row_counts().unwrap();
        let roles = counts.iter().find(|c| c.table == "roles").unwrap();
        assert_eq!(roles.rows, 1);
    }

    #[test]
    fn dashboard_stats_counts_missions_for_today() {
        let store = Store::open_in_memory().unwrap();
        let today: chrono::NaiveDate = Utc::now().date_naive();
        let p = MissionPatch {
            date: Some(today),
            kind: Some(MissionKind::Delivery),
            pallet_count: Some(1),
            ..Default::default()
        };
        store.create_mission(&p, "A").unwrap();
        let stats = store.dashboard_stats(today).unwrap();
        assert_eq!(stats.missions_today, 1);
        assert_eq!(stats.missions_created_today, 1);
    }

    #[test]
    fn user_stats_breaks_down_by_action() {
        let store = Store::open_in_memory().unwrap();
        store
            .append_audit(&crate::store::audit::AuditEntry {
                username: "PLANNER1".into(),
                session_id: None,
                action: AuditAction::Create,
                entity_kind: Some("mission".into()),
                entity_id: Some(1),
                before: None,
                after: None,
                client_ip: None,
            })
            .unwrap();
        let stats = store.user_stats("planner1").unwrap();
        assert_eq!(stats.username, "PLANNER1");
        assert_eq!(stats.total_actions, 1);
        assert_eq!(stats.breakdown[0].action, "CREATE");
    }
}
