//! `/stats/*` (§6) — the operational dashboard backed by [`StatsSvc`].

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use fretcore_domain::capability::Capability;
use fretcore_domain::models::audit::AuditAction;

use crate::pipeline::{ApiResult, Authed};
use crate::state::AppState;
use crate::stats::ApiStats;
use crate::store::audit::{AuditFilter, AuditPage};
use crate::store::stats::{DashboardStats, TableRowCount, UserActivity, UserStats};

#[derive(Debug, Deserialize)]
pub struct DaysQuery {
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    30
}

#[derive(Debug, Deserialize)]
pub struct RecentActivityQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub username: Option<String>,
    pub action_type: Option<AuditAction>,
}

fn default_limit() -> i64 {
    50
}

pub async fn dashboard(State(state): State<AppState>, Authed(ctx): Authed) -> ApiResult<Json<DashboardStats>> {
    ctx.require(Capability::ViewAnalyse)?;
    Ok(Json(state.stats.dashboard().await?))
}

pub async fn tables(State(state): State<AppState>, Authed(ctx): Authed) -> ApiResult<Json<Vec<TableRowCount>>> {
    ctx.require(Capability::ViewAnalyse)?;
    Ok(Json(state.stats.table_row_counts()?))
}

pub async fn activity_users(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Query(q): Query<DaysQuery>,
) -> ApiResult<Json<Vec<UserActivity>>> {
    ctx.require(Capability::ViewAnalyse)?;
    Ok(Json(state.stats.activity_per_user(q.days)?))
}

pub async fn api_stats(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Query(q): Query<DaysQuery>,
) -> ApiResult<Json<ApiStats>> {
    ctx.require(Capability::ViewAnalyse)?;
    Ok(Json(state.stats.api_stats(q.days)?))
}

pub async fn activity_recent(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Query(q): Query<RecentActivityQuery>,
) -> ApiResult<Json<AuditPage>> {
    ctx.require(Capability::ViewAnalyse)?;
    let filter = AuditFilter {
        username_prefix: q.username,
        action: q.action_type,
        date_from: None,
        date_to: None,
        limit: q.limit,
        offset: q.offset,
    };
    Ok(Json(state.store.query_audit(&filter)?))
}

pub async fn user_stats(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    axum::extract::Path(username): axum::extract::Path<String>,
) -> ApiResult<Json<UserStats>> {
    ctx.require(Capability::ViewAnalyse)?;
    Ok(Json(state.stats.user_stats(&username)?))
}
