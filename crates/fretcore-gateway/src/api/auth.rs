//! `/auth/*` — login, logout, refresh, change-password, `me` (§6).

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use fretcore_domain::models::user::effective_permissions;

use crate::auth_core::{AuthContext, LoginOutcome};
use crate::pipeline::{client_ip, ApiResult, Authed};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub hostname: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

fn outcome_body(outcome: &LoginOutcome) -> serde_json::Value {
    let permissions = effective_permissions(&outcome.user, &outcome.role);
    json!({
        "access_token": outcome.access_token,
        "token_type": "bearer",
        "expires_at": outcome.expires_at,
        "must_change_password": outcome.must_change_password,
        "user": {
            "id": outcome.user.id,
            "username": outcome.user.username,
            "display_name": outcome.user.display_name,
            "role": outcome.role.name,
            "is_system_admin": outcome.user.is_system_admin,
            "permissions": permissions,
        }
    })
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let user_agent = headers.get(axum::http::header::USER_AGENT).and_then(|v| v.to_str().ok());
    let outcome = state.auth.login(
        &body.username,
        &body.password,
        client_ip(&headers).as_deref(),
        body.hostname.as_deref(),
        user_agent,
    )?;
    Ok(Json(outcome_body(&outcome)))
}

/// `Authed` validates the token but discards it; `refresh` needs the raw
/// bearer token again to revoke-and-reissue, so it reads the header
/// directly rather than threading the token through the extractor.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let token = crate::pipeline::bearer_token_from_headers(&headers)
        .ok_or_else(|| fretcore_domain::Error::AuthFailed("missing bearer token".into()))?;
    let user_agent = headers.get(axum::http::header::USER_AGENT).and_then(|v| v.to_str().ok());
    let outcome = state.auth.refresh(&token, client_ip(&headers).as_deref(), None, user_agent)?;
    Ok(Json(outcome_body(&outcome)))
}

pub async fn logout(State(state): State<AppState>, Authed(ctx): Authed) -> ApiResult<Json<serde_json::Value>> {
    state.auth.logout(&ctx)?;
    Ok(Json(json!({ "status": "logged_out" })))
}

pub async fn change_password(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Json(body): Json<ChangePasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    state.auth.change_password(&ctx, &body.current_password, &body.new_password)?;
    Ok(Json(json!({ "status": "password_changed" })))
}

pub async fn me(Authed(ctx): Authed) -> Json<serde_json::Value> {
    Json(me_body(&ctx))
}

pub fn me_body(ctx: &AuthContext) -> serde_json::Value {
    json!({
        "id": ctx.user.id,
        "username": ctx.user.username,
        "display_name": ctx.user.display_name,
        "role": ctx.role.name,
        "is_system_admin": ctx.user.is_system_admin,
        "permissions": ctx.permissions,
    })
}
