//! CLI entry points and bootstrap (C1): argument parsing, config loading,
//! and `build_app_state`, which wires every subsystem in dependency order.

use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use fretcore_auth::{generate_temp_password, hash_password};
use fretcore_domain::capability::{seed_capabilities, SEED_ROLE_NAMES};
use fretcore_domain::config::{Config, ConfigSeverity};

use crate::auth_core::AuthCore;
use crate::hub::LiveSyncHub;
use crate::snapshot::SnapshotSvc;
use crate::state::AppState;
use crate::stats::StatsSvc;
use crate::store::Store;

const CONFIG_ENV: &str = "FRETCORE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";
const BOOTSTRAP_ADMIN_USERNAME: &str = "ADMIN";
const ADMIN_ROLE_NAME: &str = "admin";

#[derive(Debug, Parser)]
#[command(name = "fretcore", version, about = "Freight transport planning server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP/WebSocket server (default when no subcommand is given).
    Serve,
    /// Write a starter configuration file to the path named by FRETCORE_CONFIG.
    InitConfig,
    /// Load and validate the configuration without starting the server.
    CheckConfig,
}

/// Reads the path named by `FRETCORE_CONFIG` (default `config.toml`). A
/// missing file falls back to `Config::default()` — only `check-config`
/// treats that as worth reporting.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let config = if std::path::Path::new(&path).exists() {
        let text = std::fs::read_to_string(&path)?;
        toml::from_str(&text)?
    } else {
        Config::default()
    };
    Ok((config, path))
}

pub fn init_config(path: &str) -> anyhow::Result<()> {
    if std::path::Path::new(path).exists() {
        anyhow::bail!("{path} already exists; refusing to overwrite");
    }
    let toml = toml::to_string_pretty(&Config::default())?;
    std::fs::write(path, toml)?;
    println!("wrote starter configuration to {path}");
    Ok(())
}

/// Prints every validation issue and returns whether the configuration is
/// usable (no `Error`-severity issue).
pub fn check_config(config: &Config, path: &str) -> bool {
    let issues = config.validate();
    if issues.is_empty() {
        println!("{path}: configuration is valid");
        return true;
    }
    let mut ok = true;
    for issue in &issues {
        println!("{issue}");
        if issue.severity == ConfigSeverity::Error {
            ok = false;
        }
    }
    ok
}

fn jwt_secret_from_env(secret_env: &str) -> anyhow::Result<String> {
    std::env::var(secret_env).map_err(|_| anyhow::anyhow!("environment variable {secret_env} is not set"))
}

/// Wires every subsystem in dependency order: store, then the closed role
/// set, then (on a brand-new database) a single bootstrap administrator,
/// then auth core, hub, snapshot and stats services, and finally the
/// `AppState` struct handlers are cloned from.
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    let store = Arc::new(Store::open(&config.database.path)?);
    info!(path = %config.database.path, "store opened");

    for name in SEED_ROLE_NAMES {
        store.seed_role(name, name, seed_capabilities(name))?;
    }
    info!(roles = SEED_ROLE_NAMES.len(), "roles seeded");

    if store.count_users()? == 0 {
        let admin_role = store
            .get_role_by_name(ADMIN_ROLE_NAME)?
            .ok_or_else(|| anyhow::anyhow!("admin role missing after seeding"))?;
        let temp_password = generate_temp_password();
        let hash = hash_password(&temp_password)?;
        store.create_user(
            BOOTSTRAP_ADMIN_USERNAME,
            "Administrator",
            None,
            &hash,
            true,
            true,
            admin_role.id,
        )?;
        warn!(
            username = BOOTSTRAP_ADMIN_USERNAME,
            temp_password = %temp_password,
            "bootstrap administrator created; change this password immediately"
        );
    }

    let secret = jwt_secret_from_env(&config.auth.secret_env)?;
    let auth = Arc::new(AuthCore::new(store.clone(), &secret, config.auth.clone()));
    let hub = Arc::new(LiveSyncHub::new());
    let snapshot = Arc::new(SnapshotSvc::new(config.database.path.clone(), config.backup.dir.clone()));
    let stats = Arc::new(StatsSvc::new(store.clone(), config.database.path.clone()));
    info!("subsystems wired");

    Ok(AppState { config, store, auth, hub, snapshot, stats, started_at: Instant::now() })
}
