//! SnapshotSvc (C7): point-in-time copies of the live database file, each
//! with a JSON sidecar carrying its metadata.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fretcore_domain::trace::TraceEvent;
use fretcore_domain::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub description: Option<String>,
    pub size_bytes: u64,
}

pub struct SnapshotSvc {
    db_path: PathBuf,
    snapshot_dir: PathBuf,
}

/// Rejects any filename that could escape `snapshot_dir` (path separators,
/// `..`, or an empty string) — filenames here come straight from an HTTP
/// path segment.
fn sanitize_filename(filename: &str) -> Result<&str> {
    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
    {
        return Err(Error::Validation(format!("invalid snapshot filename: {filename}")));
    }
    Ok(filename)
}

impl SnapshotSvc {
    pub fn new(db_path: impl Into<PathBuf>, snapshot_dir: impl Into<PathBuf>) -> Self {
        Self { db_path: db_path.into(), snapshot_dir: snapshot_dir.into() }
    }

    fn sidecar_path(&self, filename: &str) -> PathBuf {
        self.snapshot_dir.join(format!("{filename}.json"))
    }

    /// Copies the live database to `snapshot_<YYYYMMDD_HHMMSS>.db` and
    /// writes its sidecar.
    pub async fn create(&self, description: Option<String>) -> Result<SnapshotMeta> {
        tokio::fs::create_dir_all(&self.snapshot_dir).await?;
        let filename = format!("snapshot_{}.db", Utc::now().format("%Y%m%d_%H%M%S"));
        let dest = self.snapshot_dir.join(&filename);
        tokio::fs::copy(&self.db_path, &dest).await?;
        let size_bytes = tokio::fs::metadata(&dest).await?.len();
        let meta = SnapshotMeta { filename: filename.clone(), created_at: Utc::now(), description, size_bytes };
        tokio::fs::write(self.sidecar_path(&filename), serde_json::to_vec_pretty(&meta)?).await?;
        TraceEvent::SnapshotCreated { filename, size_bytes }.emit();
        Ok(meta)
    }

    /// All snapshots with metadata, newest first.
    pub async fn list(&self) -> Result<Vec<SnapshotMeta>> {
        let mut out = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.snapshot_dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Ok(bytes) = tokio::fs::read(&path).await {
                if let Ok(meta) = serde_json::from_slice::<SnapshotMeta>(&bytes) {
                    out.push(meta);
                }
            }
        }
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    /// Makes a `pre_restore_<ts>.db` safety copy of the live file, then
    /// replaces it with the named snapshot. The caller (bootstrap/admin
    /// handler) is responsible for restarting the process afterwards.
    pub async fn restore(&self, filename: &str) -> Result<String> {
        let filename = sanitize_filename(filename)?;
        let src = self.snapshot_dir.join(filename);
        if tokio::fs::metadata(&src).await.is_err() {
            return Err(Error::NotFound(format!("snapshot {filename}")));
        }
        let safety_copy = format!("pre_restore_{}.db", Utc::now().format("%Y%m%d_%H%M%S"));
        if tokio::fs::metadata(&self.db_path).await.is_ok() {
            tokio::fs::copy(&self.db_path, self.snapshot_dir.join(&safety_copy)).await?;
        }
        tokio::fs::copy(&src, &self.db_path).await?;
        TraceEvent::SnapshotRestored { filename: filename.to_string(), safety_copy: safety_copy.clone() }
            .emit();
        Ok(safety_copy)
    }

    pub async fn delete(&self, filename: &str) -> Result<()> {
        let filename = sanitize_filename(filename)?;
        let path = self.snapshot_dir.join(filename);
        if tokio::fs::metadata(&path).await.is_err() {
            return Err(Error::NotFound(format!("snapshot {filename}")));
        }
        tokio::fs::remove_file(&path).await?;
        let _ = tokio::fs::remove_file(self.sidecar_path(filename)).await;
        Ok(())
    }

    /// Deletes snapshots (and sidecars) older than `retention_days`. Used by
    /// the scheduler right after the nightly snapshot.
    pub async fn cleanup(&self, retention_days: i64) -> Result<usize> {
        let cutoff = Utc::now() - chrono::Duration::days(retention_days);
        let mut removed = 0usize;
        for meta in self.list().await? {
            if meta.created_at < cutoff {
                self.delete(&meta.filename).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn svc_with_db() -> (tempfile::TempDir, SnapshotSvc) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("live.db");
        tokio::fs::write(&db_path, b"sqlite-bytes").await.unwrap();
        let snapshot_dir = dir.path().join("snapshots");
        (dir, SnapshotSvc::new(db_path, snapshot_dir))
    }

    #[tokio::test]
    async fn create_then_list_round_trips() {
        let (_dir, svc) = svc_with_db().await;
        let meta = svc.create(Some("manual".into())).await.unwrap();
        let list = svc.list().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].filename, meta.filename);
        assert_eq!(list[0].description.as_deref(), Some("manual"));
    }

    #[tokio::test]
    async fn restore_makes_safety_copy_and_replaces_live_file() {
        let (_dir, svc) = svc_with_db().await;
        let meta = svc.create(None).await.unwrap();
        tokio::fs::write(svc.db_path(), b"mutated-live-content").await.unwrap();

        let safety = svc.restore(&meta.filename).await.unwrap();
        let restored = tokio::fs::read(svc.db_path()).await.unwrap();
        assert_eq!(restored, b"sqlite-bytes");
        assert!(safety.starts_with("pre_restore_"));
    }

    #[tokio::test]
    async fn restore_rejects_path_traversal() {
        let (_dir, svc) = svc_with_db().await;
        let err = svc.restore("../../etc/passwd").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn cleanup_removes_only_snapshots_past_retention() {
        let (_dir, svc) = svc_with_db().await;
        let fresh = svc.create(None).await.unwrap();
        let old_meta = SnapshotMeta {
            filename: "snapshot_old.db".into(),
            created_at: Utc::now() - chrono::Duration::days(60),
            description: None,
            size_bytes: 3,
        };
        tokio::fs::write(svc.sidecar_path(&old_meta.filename), serde_json::to_vec(&old_meta).unwrap())
            .await
            .unwrap();
        tokio::fs::write(
            std::path::Path::new(&svc.sidecar_path(&old_meta.filename)).with_extension(""),
            b"old",
        )
        .await
        .unwrap();

        let removed = svc.cleanup(30).await.unwrap();
        assert_eq!(removed, 1);
        let remaining = svc.list().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].filename, fresh.filename);
    }
}
