use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::Serialize;

use fretcore_domain::Result;

use super::{map_db_err, Store};

/// One row per completed HTTP call; recorded independently of the domain
/// transaction for the same request (pipeline step 7).
#[derive(Debug, Clone)]
pub struct RequestEntry {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub username: Option<String>,
    pub client_ip: Option<String>,
    pub status_code: i64,
    pub response_time_ms: i64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PathCount {
    pub path: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status_code: i64,
    pub count: i64,
}

impl Store {
    pub fn record_request(&self, entry: &RequestEntry) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO request_records (method, path, query, username, client_ip, \
             status_code, response_time_ms, error, created_at) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
            params![
                entry.method,
                entry.path,
                entry.query,
                entry.username,
                entry.client_ip,
                entry.status_code,
                entry.response_time_ms,
                entry.error,
                Utc::now(),
            ],
        )
        .map_err(map_db_err)?;
        Ok(())
    }

    pub fn requests_count_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let conn = self.lock();
        conn.query_row(
            "SELECT COUNT(*) FROM request_records WHERE created_at >= ?1",
            params![since],
            |r| r.get(0),
        )
        .map_err(map_db_err)
    }

    pub fn error_count_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let conn = self.lock();
        conn.query_row(
            "SELECT COUNT(*) FROM request_records WHERE created_at >= ?1 AND status_code >= 400",
            params![since],
            |r| r.get(0),
        )
        .map_err(map_db_err)
    }

    pub fn top_paths(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<PathCount>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(
                "SELECT path, COUNT(*) as c FROM request_records WHERE created_at >= ?1 \
                 GROUP BY path ORDER BY c DESC LIMIT ?2",
            )
            .map_err(map_db_err)?;
        let rows = stmt
            .query_map(params![since, limit], |r| Ok(PathCount { path: r.get(0)?, count: r.get(1)? }))
            .map_err(map_db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_db_err)
    }

    pub fn status_distribution(&self, since: DateTime<Utc>) -> Result<Vec<StatusCount>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(
                "SELECT status_code, COUNT(*) FROM request_records WHERE created_at >= ?1 \
                 GROUP BY status_code ORDER BY status_code ASC",
            )
            .map_err(map_db_err)?;
        let rows = stmt
            .query_map(params![since], |r| {
                Ok(StatusCount { status_code: r.get(0)?, count: r.get(1)? })
            })
            .map_err(map_db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_db_err)
    }

    /// Average response time in ms over non-null values since `since`.
    pub fn avg_response_time_ms(&self, since: DateTime<Utc>) -> Result<Option<f64>> {
        let conn = self.lock();
        conn.query_row(
            "SELECT AVG(response_time_ms) FROM request_records WHERE created_at >= ?1",
            params![since],
            |r| r.get(0),
        )
        .map_err(map_db_err)
    }

    /// Deletes request records older than `retention_days`; used by the
    /// scheduler alongside snapshot retention.
    pub fn sweep_old_requests(&self, retention_days: i64) -> Result<usize> {
        let cutoff = Utc::now() - chrono::Duration::days(retention_days);
        let conn = self.lock();
        conn.execute("DELETE FROM request_records WHERE created_at < ?1", params![cutoff])
            .map_err(map_db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, status: i64) -> RequestEntry {
        RequestEntry {
            method: "GET".into(),
            path: path.into(),
            query: None,
            username: Some("PLANNER1".into()),
            client_ip: None,
            status_code: status,
            response_time_ms: 42,
            error: None,
        }
    }

    #[test]
    fn error_count_only_counts_4xx_5xx() {
        let store = Store::open_in_memory().unwrap();
        store.record_request(&entry("/missions", 200)).unwrap();
        store.record_request(&entry("/missions", 403)).unwrap();
        let since = Utc::now() - chrono::Duration::hours(1);
        assert_eq!(store.requests_count_since(since).unwrap(), 2);
        assert_eq!(store.error_count_since(since).unwrap(), 1);
    }

    #[test]
    fn top_paths_orders_by_count_desc() {
        let store = Store::open_in_memory().unwrap();
        store.record_request(&entry("/missions", 200)).unwrap();
        store.record_request(&entry("/missions", 200)).unwrap();
        store.record_request(&entry("/voyages", 200)).unwrap();
        let since = Utc::now() - chrono::Duration::hours(1);
        let top = store.top_paths(since, 10).unwrap();
        assert_eq!(top[0].path, "/missions");
        assert_eq!(top[0].count, 2);
    }
}
