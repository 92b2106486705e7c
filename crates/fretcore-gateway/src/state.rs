//! Shared application state passed to every handler and background task.
//!
//! Built once by [`crate::cli::build_app_state`] in dependency order
//! (config -> store -> auth core -> hub -> snapshot/stats) and cloned
//! cheaply (every field is an `Arc`) into each axum handler.

use std::sync::Arc;
use std::time::Instant;

use fretcore_domain::config::Config;

use crate::auth_core::AuthCore;
use crate::hub::LiveSyncHub;
use crate::snapshot::SnapshotSvc;
use crate::stats::StatsSvc;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<Store>,
    pub auth: Arc<AuthCore>,
    pub hub: Arc<LiveSyncHub>,
    pub snapshot: Arc<SnapshotSvc>,
    pub stats: Arc<StatsSvc>,
    /// Process start instant, for `/health`'s `uptime_seconds`.
    pub started_at: Instant,
}
