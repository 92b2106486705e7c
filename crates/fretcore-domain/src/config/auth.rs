use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Environment variable holding the JWT signing secret. Must resolve to
    /// >=32 bytes at startup or `Config::validate` raises an Error.
    #[serde(default = "d_secret_env")]
    pub secret_env: String,
    #[serde(default = "d_session_hours")]
    pub session_hours: i64,
    #[serde(default = "d_max_failed_attempts")]
    pub max_failed_attempts: i64,
    #[serde(default = "d_lockout_minutes")]
    pub lockout_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_env: d_secret_env(),
            session_hours: d_session_hours(),
            max_failed_attempts: d_max_failed_attempts(),
            lockout_minutes: d_lockout_minutes(),
        }
    }
}

fn d_secret_env() -> String {
    "FRETCORE_JWT_SECRET".into()
}
fn d_session_hours() -> i64 {
    8
}
fn d_max_failed_attempts() -> i64 {
    5
}
fn d_lockout_minutes() -> i64 {
    15
}
