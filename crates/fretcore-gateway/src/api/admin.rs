//! `/admin/*` (§6) — user/role/session management, backups, config
//! inspection, and the audit log browser. Every handler here gates on
//! either `manage_rights` (identity/role surface) or `admin_access`
//! (operational surface: sessions, backups, config, logs).

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use fretcore_domain::capability::Capability;
use fretcore_domain::models::audit::AuditAction;
use fretcore_domain::models::role::Role;
use fretcore_domain::models::session::Session;
use fretcore_domain::models::user::User;
use fretcore_domain::Error;

use crate::pipeline::{audit, client_ip, ApiResult, Authed};
use crate::snapshot::SnapshotMeta;
use crate::state::AppState;
use crate::store::audit::{AuditFilter, AuditPage};
use crate::store::users::UserPatch;
use crate::wire::{UserCreateInput, UserUpdateInput};

fn into_patch(input: UserUpdateInput) -> UserPatch {
    UserPatch {
        display_name: input.display_name,
        email: input.email,
        is_active: input.is_active,
        is_system_admin: input.is_system_admin,
        role_id: input.role_id,
    }
}

fn user_body(user: &User) -> serde_json::Value {
    serde_json::to_value(user).unwrap_or(json!({}))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Users & roles
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn list_users(State(state): State<AppState>, Authed(ctx): Authed) -> ApiResult<Json<Vec<User>>> {
    ctx.require(Capability::ManageRights)?;
    Ok(Json(state.store.list_users()?))
}

pub async fn create_user(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Json(body): Json<UserCreateInput>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.require(Capability::ManageRights)?;
    let (password_hash, must_change_password, temp_password) = match &body.password {
        Some(explicit) => {
            fretcore_auth::validate_password_strength(explicit)?;
            (fretcore_auth::hash_password(explicit)?, false, None)
        }
        None => {
            let temp = fretcore_auth::generate_temp_password();
            (fretcore_auth::hash_password(&temp)?, true, Some(temp))
        }
    };
    let created = state.store.create_user(
        &body.username,
        &body.display_name,
        body.email.as_deref(),
        &password_hash,
        must_change_password,
        body.is_system_admin,
        body.role_id,
    )?;
    audit(
        &state,
        &ctx,
        AuditAction::Create,
        "user",
        Some(created.id),
        None,
        Some(user_body(&created)),
        client_ip(&headers),
    );
    let mut body = user_body(&created);
    if let Some(temp) = temp_password {
        body["temp_password"] = json!(temp);
    }
    Ok(Json(body))
}

pub async fn update_user(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<UserUpdateInput>,
) -> ApiResult<Json<User>> {
    ctx.require(Capability::ManageRights)?;
    let before = state.store.get_user(id)?.ok_or_else(|| Error::NotFound(format!("user {id}")))?;
    let updated = state.store.update_user(id, &into_patch(body))?;
    audit(
        &state,
        &ctx,
        AuditAction::Update,
        "user",
        Some(id),
        Some(user_body(&before)),
        Some(user_body(&updated)),
        client_ip(&headers),
    );
    Ok(Json(updated))
}

pub async fn deactivate_user(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<User>> {
    ctx.require(Capability::ManageRights)?;
    let deactivated = state.store.deactivate_user(id)?;
    audit(
        &state,
        &ctx,
        AuditAction::Deactivate,
        "user",
        Some(id),
        None,
        Some(user_body(&deactivated)),
        client_ip(&headers),
    );
    Ok(Json(deactivated))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.require(Capability::ManageRights)?;
    let temp_password = state.auth.admin_reset_password(id)?;
    audit(&state, &ctx, AuditAction::PasswordReset, "user", Some(id), None, None, client_ip(&headers));
    Ok(Json(json!({ "temp_password": temp_password })))
}

pub async fn list_roles(State(state): State<AppState>, Authed(ctx): Authed) -> ApiResult<Json<Vec<Role>>> {
    ctx.require(Capability::ManageRights)?;
    Ok(Json(state.store.list_roles()?))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sessions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn list_sessions(State(state): State<AppState>, Authed(ctx): Authed) -> ApiResult<Json<Vec<Session>>> {
    ctx.require(Capability::AdminAccess)?;
    Ok(Json(state.store.list_active_sessions()?))
}

/// §8 scenario 6: every push channel owned by `username` is closed and
/// its sessions revoked before this handler returns.
pub async fn disconnect_user(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.require(Capability::AdminAccess)?;
    let revoked = state.auth.force_disconnect(&username)?;
    state.hub.evict_sessions(&revoked);
    audit(
        &state,
        &ctx,
        AuditAction::ForceDisconnect,
        "user",
        None,
        None,
        Some(json!({ "username": username, "sessions_revoked": revoked.len() })),
        client_ip(&headers),
    );
    Ok(Json(json!({ "status": "disconnected", "sessions_revoked": revoked })))
}

pub async fn kick_session(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.require(Capability::AdminAccess)?;
    state.store.revoke_session_by_id(&session_id)?;
    state.hub.evict_sessions(std::slice::from_ref(&session_id));
    audit(&state, &ctx, AuditAction::SessionKick, "session", None, None, None, client_ip(&headers));
    Ok(Json(json!({ "status": "kicked", "session_id": session_id })))
}

pub async fn kick_all_sessions(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.require(Capability::AdminAccess)?;
    let sessions = state.store.list_active_sessions()?;
    let ids: Vec<String> = sessions.into_iter().map(|s| s.session_id).collect();
    for id in &ids {
        state.store.revoke_session_by_id(id)?;
    }
    state.hub.evict_sessions(&ids);
    audit(
        &state,
        &ctx,
        AuditAction::SessionKickAll,
        "session",
        None,
        None,
        Some(json!({ "sessions_revoked": ids.len() })),
        client_ip(&headers),
    );
    Ok(Json(json!({ "status": "all_kicked", "sessions_revoked": ids.len() })))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Backups
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct CreateBackupQuery {
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CleanupQuery {
    pub retention_days: i64,
}

pub async fn list_backups(State(state): State<AppState>, Authed(ctx): Authed) -> ApiResult<Json<Vec<SnapshotMeta>>> {
    ctx.require(Capability::AdminAccess)?;
    Ok(Json(state.snapshot.list().await?))
}

pub async fn create_backup(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Query(q): Query<CreateBackupQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.require(Capability::AdminAccess)?;
    let meta = state.snapshot.create(q.description).await?;
    audit(
        &state,
        &ctx,
        AuditAction::BackupCreate,
        "backup",
        None,
        None,
        Some(serde_json::to_value(&meta)?),
        client_ip(&headers),
    );
    Ok(Json(json!({
        "backup_file": meta.filename,
        "created_at": meta.created_at,
        "size_bytes": meta.size_bytes,
    })))
}

pub async fn restore_backup(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Path(file): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.require(Capability::AdminAccess)?;
    let safety_copy = state.snapshot.restore(&file).await?;
    audit(
        &state,
        &ctx,
        AuditAction::BackupRestore,
        "backup",
        None,
        None,
        Some(json!({ "restored": file, "safety_copy": safety_copy })),
        client_ip(&headers),
    );
    Ok(Json(json!({ "status": "restored", "file": file, "safety_copy": safety_copy })))
}

pub async fn delete_backup(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Path(file): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.require(Capability::AdminAccess)?;
    state.snapshot.delete(&file).await?;
    Ok(Json(json!({ "status": "deleted", "file": file })))
}

pub async fn cleanup_backups(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Query(q): Query<CleanupQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.require(Capability::AdminAccess)?;
    let removed = state.snapshot.cleanup(q.retention_days).await?;
    Ok(Json(json!({ "status": "cleaned", "removed": removed })))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config & audit log
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn show_config(State(state): State<AppState>, Authed(ctx): Authed) -> ApiResult<Json<serde_json::Value>> {
    ctx.require(Capability::AdminAccess)?;
    Ok(Json(json!({
        "server": { "port": state.config.server.port, "host": state.config.server.host },
        "database": { "path": state.config.database.path },
        "auth": {
            "session_hours": state.config.auth.session_hours,
            "max_failed_attempts": state.config.auth.max_failed_attempts,
            "lockout_minutes": state.config.auth.lockout_minutes,
        },
        "backup": state.config.backup,
        "logging": state.config.logging,
    })))
}

#[derive(Debug, Deserialize)]
pub struct AuditLogQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub username: Option<String>,
    pub action_type: Option<AuditAction>,
    pub date_start: Option<chrono::DateTime<chrono::Utc>>,
    pub date_end: Option<chrono::DateTime<chrono::Utc>>,
}

fn default_limit() -> i64 {
    100
}

pub async fn logs(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Query(q): Query<AuditLogQuery>,
) -> ApiResult<Json<AuditPage>> {
    ctx.require(Capability::AdminAccess)?;
    let filter = AuditFilter {
        username_prefix: q.username,
        action: q.action_type,
        date_from: q.date_start,
        date_to: q.date_end,
        limit: q.limit,
        offset: q.offset,
    };
    Ok(Json(state.store.query_audit(&filter)?))
}
