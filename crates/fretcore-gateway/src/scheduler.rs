//! Scheduler (C6): a one-minute-resolution background loop driving the
//! continuous session sweep and the once-a-day snapshot/retention sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::Timelike;
use tokio_util::sync::CancellationToken;

use fretcore_domain::config::BackupConfig;
use fretcore_domain::trace::TraceEvent;

use crate::snapshot::SnapshotSvc;
use crate::store::Store;

const TICK: Duration = Duration::from_secs(60);

/// Runs until `shutdown` is cancelled, checked once per tick so the loop
/// exits within at most one minute of a graceful shutdown request.
pub async fn run(store: Arc<Store>, snapshot: Arc<SnapshotSvc>, config: BackupConfig, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(TICK);
    let mut last_backup_date: Option<chrono::NaiveDate> = None;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("scheduler shutting down");
                return;
            }
            _ = interval.tick() => {}
        }

        sweep_sessions(&store);

        let now = chrono::Utc::now();
        let today = now.date_naive();
        if now.hour() == config.auto_backup_hour as u32 && last_backup_date != Some(today) {
            last_backup_date = Some(today);
            run_nightly_backup(&store, &snapshot, &config).await;
        }
    }
}

fn sweep_sessions(store: &Store) {
    match store.sweep_expired_sessions() {
        Ok(swept) if swept > 0 => TraceEvent::SessionExpiredSweep { swept }.emit(),
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "session sweep failed"),
    }
}

async fn run_nightly_backup(store: &Store, snapshot: &SnapshotSvc, config: &BackupConfig) {
    match snapshot.create(Some("nightly".into())).await {
        Ok(meta) => tracing::info!(filename = %meta.filename, size_bytes = meta.size_bytes, "nightly snapshot created"),
        Err(e) => tracing::warn!(error = %e, "nightly snapshot failed"),
    }
    match snapshot.cleanup(config.retention_days).await {
        Ok(removed) => tracing::info!(removed, "snapshot retention cleanup done"),
        Err(e) => tracing::warn!(error = %e, "snapshot cleanup failed"),
    }
    match store.sweep_old_requests(config.retention_days) {
        Ok(removed) => tracing::info!(removed, "request record retention cleanup done"),
        Err(e) => tracing::warn!(error = %e, "request record cleanup failed"),
    }
}
