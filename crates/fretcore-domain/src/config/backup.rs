use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    #[serde(default = "d_dir")]
    pub dir: String,
    #[serde(default = "d_retention_days")]
    pub retention_days: i64,
    /// Hour of day (0-23, local-to-process clock) the scheduler fires the
    /// nightly snapshot.
    #[serde(default = "d_hour")]
    pub auto_backup_hour: u8,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: d_dir(),
            retention_days: d_retention_days(),
            auto_backup_hour: d_hour(),
        }
    }
}

fn d_dir() -> String {
    "data/snapshots".into()
}
fn d_retention_days() -> i64 {
    30
}
fn d_hour() -> u8 {
    2
}
