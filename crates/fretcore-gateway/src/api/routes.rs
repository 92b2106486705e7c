//! `/voyages` (§6) — route/line definitions.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use fretcore_domain::capability::Capability;
use fretcore_domain::models::audit::AuditAction;
use fretcore_domain::models::route::Route;
use fretcore_domain::Error;

use crate::hub::ChangeAction;
use crate::pipeline::{audit, client_ip, ApiResult, Authed};
use crate::state::AppState;
use crate::store::routes::RoutePatch;
use crate::wire::RouteInput;

#[derive(Debug, Deserialize)]
pub struct RouteListQuery {
    #[serde(default)]
    pub active_only: bool,
    pub pays: Option<String>,
}

fn into_patch(input: RouteInput) -> RoutePatch {
    RoutePatch {
        code: input.code,
        name: input.name,
        description: input.description,
        origin: input.origin,
        destination: input.destination,
        country: input.country,
        default_start_time: input.default_start_time,
        default_end_time: input.default_end_time,
        operating_days: input.operating_days,
        avg_pallet_count: input.avg_pallet_count,
        color: input.color,
    }
}

pub async fn list(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Query(q): Query<RouteListQuery>,
) -> ApiResult<Json<Vec<Route>>> {
    ctx.require(Capability::ViewPlanning)?;
    Ok(Json(state.store.list_routes(q.active_only, q.pays.as_deref())?))
}

pub async fn get(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Path(id): Path<i64>,
) -> ApiResult<Json<Route>> {
    ctx.require(Capability::ViewPlanning)?;
    let route = state.store.get_route(id)?.ok_or_else(|| Error::NotFound(format!("route {id}")))?;
    Ok(Json(route))
}

pub async fn get_by_code(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Path(code): Path<String>,
) -> ApiResult<Json<Route>> {
    ctx.require(Capability::ViewPlanning)?;
    let route = state.store.get_route_by_code(&code)?.ok_or_else(|| Error::NotFound(format!("route {code}")))?;
    Ok(Json(route))
}

pub async fn create(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Json(body): Json<RouteInput>,
) -> ApiResult<Json<Route>> {
    ctx.require(Capability::ManageVoyages)?;
    let created = state.store.create_route(&into_patch(body))?;
    audit(
        &state,
        &ctx,
        AuditAction::Create,
        "route",
        Some(created.id),
        None,
        Some(serde_json::to_value(&created)?),
        client_ip(&headers),
    );
    state.hub.publish_data_changed("routes", ChangeAction::Created, Some(created.id), &ctx.user.username);
    Ok(Json(created))
}

pub async fn update(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<RouteInput>,
) -> ApiResult<Json<Route>> {
    ctx.require(Capability::ManageVoyages)?;
    let before = state.store.get_route(id)?.ok_or_else(|| Error::NotFound(format!("route {id}")))?;
    let updated = state.store.update_route(id, &into_patch(body))?;
    audit(
        &state,
        &ctx,
        AuditAction::Update,
        "route",
        Some(id),
        Some(serde_json::to_value(&before)?),
        Some(serde_json::to_value(&updated)?),
        client_ip(&headers),
    );
    state.hub.publish_data_changed("routes", ChangeAction::Updated, Some(id), &ctx.user.username);
    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.require(Capability::ManageVoyages)?;
    let deleted = state.store.delete_route(id)?;
    audit(
        &state,
        &ctx,
        AuditAction::Delete,
        "route",
        Some(id),
        Some(serde_json::to_value(&deleted)?),
        None,
        client_ip(&headers),
    );
    state.hub.publish_data_changed("routes", ChangeAction::Deleted, Some(id), &ctx.user.username);
    Ok(Json(json!({ "status": "deleted", "id": id })))
}
