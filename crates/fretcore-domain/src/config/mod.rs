mod auth;
mod backup;
mod database;
mod logging;
mod server;

pub use auth::*;
pub use backup::*;
pub use database::*;
pub use logging::*;
pub use server::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues. An empty
    /// vec means the configuration is usable as-is.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.server.port == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }
        if self.server.host.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }
        if self.server.cors.allowed_origins.len() == 1 && self.server.cors.allowed_origins[0] == "*"
        {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                field: "server.cors.allowed_origins".into(),
                message: "wildcard \"*\" allows all origins (not recommended for production)"
                    .into(),
            });
        }
        if let Some(rl) = &self.server.rate_limit {
            if rl.requests_per_second == 0 {
                issues.push(ConfigIssue {
                    severity: ConfigSeverity::Error,
                    field: "server.rate_limit.requests_per_second".into(),
                    message: "requests_per_second must be greater than 0".into(),
                });
            }
            if rl.burst_size == 0 {
                issues.push(ConfigIssue {
                    severity: ConfigSeverity::Error,
                    field: "server.rate_limit.burst_size".into(),
                    message: "burst_size must be greater than 0".into(),
                });
            }
        }

        if self.database.path.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "database.path".into(),
                message: "path must not be empty".into(),
            });
        }

        // The JWT secret is read from an env var named by auth.secret_env —
        // checked here since a missing/short secret is a startup-fatal
        // misconfiguration, not a runtime one.
        if self.auth.secret_env.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "auth.secret_env".into(),
                message: "secret_env must name an environment variable".into(),
            });
        } else {
            match std::env::var(&self.auth.secret_env) {
                Ok(v) if v.len() >= 32 => {}
                Ok(_) => issues.push(ConfigIssue {
                    severity: ConfigSeverity::Error,
                    field: "auth.secret_env".into(),
                    message: format!(
                        "{} must be at least 32 bytes",
                        self.auth.secret_env
                    ),
                }),
                Err(_) => issues.push(ConfigIssue {
                    severity: ConfigSeverity::Error,
                    field: "auth.secret_env".into(),
                    message: format!("{} is not set", self.auth.secret_env),
                }),
            }
        }
        if self.auth.session_hours <= 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "auth.session_hours".into(),
                message: "session_hours must be greater than 0".into(),
            });
        }
        if self.auth.max_failed_attempts <= 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "auth.max_failed_attempts".into(),
                message: "max_failed_attempts must be greater than 0".into(),
            });
        }
        if self.auth.lockout_minutes <= 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "auth.lockout_minutes".into(),
                message: "lockout_minutes must be greater than 0".into(),
            });
        }

        if self.backup.retention_days <= 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "backup.retention_days".into(),
                message: "retention_days must be greater than 0".into(),
            });
        }
        if self.backup.auto_backup_hour > 23 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "backup.auto_backup_hour".into(),
                message: "auto_backup_hour must be 0-23".into(),
            });
        }
        if self.backup.dir.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "backup.dir".into(),
                message: "dir must not be empty".into(),
            });
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        std::env::set_var("FRETCORE_TEST_SECRET", "x".repeat(32));
        Config {
            auth: AuthConfig {
                secret_env: "FRETCORE_TEST_SECRET".into(),
                ..AuthConfig::default()
            },
            ..Config::default()
        }
    }

    fn find_issue<'a>(issues: &'a [ConfigIssue], field_prefix: &str) -> Option<&'a ConfigIssue> {
        issues.iter().find(|e| e.field.starts_with(field_prefix))
    }

    #[test]
    fn valid_config_has_no_errors() {
        let issues = valid_config().validate();
        let errors: Vec<_> = issues
            .iter()
            .filter(|i| i.severity == ConfigSeverity::Error)
            .collect();
        assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    }

    #[test]
    fn port_zero_is_error() {
        let mut cfg = valid_config();
        cfg.server.port = 0;
        let issues = cfg.validate();
        assert_eq!(
            find_issue(&issues, "server.port").unwrap().severity,
            ConfigSeverity::Error
        );
    }

    #[test]
    fn missing_secret_env_is_error() {
        let mut cfg = valid_config();
        cfg.auth.secret_env = "FRETCORE_DOES_NOT_EXIST".into();
        let issues = cfg.validate();
        assert_eq!(
            find_issue(&issues, "auth.secret_env").unwrap().severity,
            ConfigSeverity::Error
        );
    }

    #[test]
    fn short_secret_is_error() {
        std::env::set_var("FRETCORE_SHORT_SECRET", "short");
        let mut cfg = valid_config();
        cfg.auth.secret_env = "FRETCORE_SHORT_SECRET".into();
        let issues = cfg.validate();
        assert_eq!(
            find_issue(&issues, "auth.secret_env").unwrap().severity,
            ConfigSeverity::Error
        );
    }

    #[test]
    fn cors_wildcard_is_warning() {
        let mut cfg = valid_config();
        cfg.server.cors.allowed_origins = vec!["*".into()];
        let issues = cfg.validate();
        assert_eq!(
            find_issue(&issues, "server.cors.allowed_origins")
                .unwrap()
                .severity,
            ConfigSeverity::Warning
        );
    }

    #[test]
    fn bad_backup_hour_is_error() {
        let mut cfg = valid_config();
        cfg.backup.auto_backup_hour = 24;
        let issues = cfg.validate();
        assert_eq!(
            find_issue(&issues, "backup.auto_backup_hour")
                .unwrap()
                .severity,
            ConfigSeverity::Error
        );
    }

    #[test]
    fn config_issue_display_format() {
        let err = ConfigIssue {
            severity: ConfigSeverity::Error,
            field: "server.port".into(),
            message: "port must be greater than 0".into(),
        };
        assert_eq!(
            format!("{err}"),
            "[ERROR] server.port: port must be greater than 0"
        );
    }
}
