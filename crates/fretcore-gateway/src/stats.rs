//! StatsSvc (C8): read-only aggregates over the Store and the audit log,
//! composed for the operational dashboard. Every method here only reads;
//! none of them touch AuditLog or mutate domain state.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;

use fretcore_domain::Result;

use crate::store::requests::{PathCount, StatusCount};
use crate::store::stats::{DashboardStats, TableRowCount, UserActivity, UserStats};
use crate::store::Store;

#[derive(Debug, Clone, Serialize)]
pub struct ApiStats {
    pub top_paths: Vec<PathCount>,
    pub status_distribution: Vec<StatusCount>,
    pub avg_response_time_ms: Option<f64>,
}

pub struct StatsSvc {
    store: Arc<Store>,
    db_path: PathBuf,
}

impl StatsSvc {
    pub fn new(store: Arc<Store>, db_path: impl Into<PathBuf>) -> Self {
        Self { store, db_path: db_path.into() }
    }

    pub async fn dashboard(&self) -> Result<DashboardStats> {
        let today = Utc::now().date_naive();
        let mut stats = self.store.dashboard_stats(today)?;
        stats.database_size_bytes =
            tokio::fs::metadata(&self.db_path).await.map(|m| m.len()).unwrap_or(0);
        Ok(stats)
    }

    pub fn table_row_counts(&self) -> Result<Vec<TableRowCount>> {
        self.store.table_row_counts()
    }

    pub fn activity_per_user(&self, days: i64) -> Result<Vec<UserActivity>> {
        let since = Utc::now() - Duration::days(days.max(0));
        self.store.activity_per_user(since)
    }

    pub fn api_stats(&self, days: i64) -> Result<ApiStats> {
        let since = Utc::now() - Duration::days(days.max(0));
        Ok(ApiStats {
            top_paths: self.store.top_paths(since, 10)?,
            status_distribution: self.store.status_distribution(since)?,
            avg_response_time_ms: self.store.avg_response_time_ms(since)?,
        })
    }

    pub fn user_stats(&self, username: &str) -> Result<UserStats> {
        self.store.user_stats(username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dashboard_reports_database_size() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("live.db");
        let store = Arc::new(Store::open(&db_path).unwrap());
        let svc = StatsSvc::new(store, &db_path);
        let stats = svc.dashboard().await.unwrap();
        assert!(stats.database_size_bytes > 0);
    }
}
