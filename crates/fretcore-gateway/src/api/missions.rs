//! `/missions` (§6) — the only entity whose wire input accepts the
//! original French field aliases (§9); everything else here is a thin
//! RequestPipeline wrapper over `Store`'s mission module.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use fretcore_domain::capability::Capability;
use fretcore_domain::models::audit::AuditAction;
use fretcore_domain::models::mission::{validate_mission_shape, Mission, MissionFilter};
use fretcore_domain::Error;

use crate::hub::ChangeAction;
use crate::pipeline::{audit, client_ip, ApiResult, Authed};
use crate::state::AppState;
use crate::store::missions::MissionPatch;
use crate::wire::MissionInput;

/// A mission write response: the written record plus any non-blocking
/// warnings (§7 `warnings[]` vs `errors[]` split — an invalid shape is a
/// 400 `errors[]` before the store is ever touched; these are advisory).
#[derive(Debug, serde::Serialize)]
pub struct MissionWriteResponse {
    #[serde(flatten)]
    pub mission: Mission,
    pub warnings: Vec<String>,
}

/// Checks the invariants that must hold before a mission is written
/// (`pallet_count >= 0`, `start_time <= end_time`), then reports the
/// non-blocking conditions called out in §3: an assigned driver who is
/// inactive or unavailable on `date`.
fn validate_and_warn(
    state: &AppState,
    pallet_count: i64,
    start_time: &Option<String>,
    end_time: &Option<String>,
    driver_id: Option<i64>,
    date: Option<NaiveDate>,
) -> ApiResult<Vec<String>> {
    validate_mission_shape(pallet_count, start_time, end_time).map_err(Error::Validation)?;

    let mut warnings = Vec::new();
    if let Some(driver_id) = driver_id {
        if let Some(driver) = state.store.get_driver(driver_id)? {
            if !driver.is_active {
                warnings.push(format!("driver {driver_id} is not active"));
            }
        }
        if let Some(date) = date {
            if state.store.is_driver_unavailable_on(driver_id, date)? {
                warnings.push(format!("driver {driver_id} is unavailable on {date}"));
            }
        }
    }
    Ok(warnings)
}

#[derive(Debug, Deserialize)]
pub struct MissionListQuery {
    pub date_debut: Option<NaiveDate>,
    pub date_fin: Option<NaiveDate>,
    pub chauffeur_id: Option<i64>,
    pub voyage_id: Option<i64>,
    pub statut: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    100
}

pub async fn list(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Query(q): Query<MissionListQuery>,
) -> ApiResult<Json<Vec<Mission>>> {
    ctx.require(Capability::ViewPlanning)?;
    let status = q.statut.as_deref().map(crate::wire::parse_mission_status).transpose()?;
    let filter = MissionFilter {
        date_from: q.date_debut,
        date_to: q.date_fin,
        driver_id: q.chauffeur_id,
        route_id: q.voyage_id,
        status,
        limit: q.limit,
        offset: q.offset,
    };
    Ok(Json(state.store.list_missions(&filter)?))
}

pub async fn by_date(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Path(date): Path<NaiveDate>,
) -> ApiResult<Json<Vec<Mission>>> {
    ctx.require(Capability::ViewPlanning)?;
    Ok(Json(state.store.missions_by_date(date)?))
}

pub async fn get(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Path(id): Path<i64>,
) -> ApiResult<Json<Mission>> {
    ctx.require(Capability::ViewPlanning)?;
    let mission = state.store.get_mission(id)?.ok_or_else(|| Error::NotFound(format!("mission {id}")))?;
    Ok(Json(mission))
}

/// Resolves `route_id`/`voyage: {code}` into a concrete `route_id`, then
/// builds the `MissionPatch` the store expects. Shared by create/update.
fn resolve_patch(state: &AppState, input: &MissionInput) -> ApiResult<MissionPatch> {
    let mut route_id = input.route_id_hint();
    if route_id.is_none() {
        if let Some(code) = input.route_code_hint() {
            route_id = state.store.get_route_by_code(code)?.map(|r| r.id);
        }
    }
    Ok(MissionPatch {
        date: input.date,
        start_time: Some(input.start_time.clone()),
        end_time: Some(input.end_time.clone()),
        route_id: Some(route_id),
        driver_id: Some(input.driver_id),
        sst_id: Some(input.sst_id),
        kind: input.kind()?,
        origin: Some(input.origin.clone()),
        destination: Some(input.destination.clone()),
        country: Some(input.country.clone()),
        pallet_count: input.pallet_count,
        weight_kg: Some(input.weight_kg),
        tractor: Some(input.tractor.clone()),
        trailer: Some(input.trailer.clone()),
        status: input.status()?,
        note: Some(input.note.clone()),
        cost_sst: Some(input.cost_sst),
        revenue: Some(input.revenue),
    })
}

pub async fn create(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Json(body): Json<MissionInput>,
) -> ApiResult<Json<MissionWriteResponse>> {
    ctx.require(Capability::EditPlanning)?;
    let patch = resolve_patch(&state, &body)?;
    let warnings = validate_and_warn(
        &state,
        patch.pallet_count.unwrap_or(0),
        &patch.start_time.clone().flatten(),
        &patch.end_time.clone().flatten(),
        patch.driver_id.flatten(),
        patch.date,
    )?;
    let created = state.store.create_mission(&patch, &ctx.user.username)?;
    audit(
        &state,
        &ctx,
        AuditAction::Create,
        "mission",
        Some(created.id),
        None,
        Some(serde_json::to_value(&created)?),
        client_ip(&headers),
    );
    state.hub.publish_data_changed("missions", ChangeAction::Created, Some(created.id), &ctx.user.username);
    Ok(Json(MissionWriteResponse { mission: created, warnings }))
}

pub async fn update(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<MissionInput>,
) -> ApiResult<Json<MissionWriteResponse>> {
    ctx.require(Capability::EditPlanning)?;
    let before = state.store.get_mission(id)?.ok_or_else(|| Error::NotFound(format!("mission {id}")))?;
    let patch = resolve_patch(&state, &body)?;
    let warnings = validate_and_warn(
        &state,
        patch.pallet_count.unwrap_or(before.pallet_count),
        &patch.start_time.clone().unwrap_or_else(|| before.start_time.clone()),
        &patch.end_time.clone().unwrap_or_else(|| before.end_time.clone()),
        patch.driver_id.unwrap_or(before.driver_id),
        Some(patch.date.unwrap_or(before.date)),
    )?;
    let updated = state.store.update_mission(id, &patch, &ctx.user.username)?;
    audit(
        &state,
        &ctx,
        AuditAction::Update,
        "mission",
        Some(id),
        Some(serde_json::to_value(&before)?),
        Some(serde_json::to_value(&updated)?),
        client_ip(&headers),
    );
    state.hub.publish_data_changed("missions", ChangeAction::Updated, Some(id), &ctx.user.username);
    Ok(Json(MissionWriteResponse { mission: updated, warnings }))
}

pub async fn delete(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.require(Capability::EditPlanning)?;
    let deleted = state.store.delete_mission(id)?;
    audit(
        &state,
        &ctx,
        AuditAction::Delete,
        "mission",
        Some(id),
        Some(serde_json::to_value(&deleted)?),
        None,
        client_ip(&headers),
    );
    state.hub.publish_data_changed("missions", ChangeAction::Deleted, Some(id), &ctx.user.username);
    Ok(Json(json!({ "status": "deleted", "id": id })))
}

pub async fn bulk_create(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Json(body): Json<Vec<MissionInput>>,
) -> ApiResult<Json<Vec<MissionWriteResponse>>> {
    ctx.require(Capability::EditPlanning)?;
    let patches = body.iter().map(|i| resolve_patch(&state, i)).collect::<ApiResult<Vec<_>>>()?;
    let mut warnings_by_patch = Vec::with_capacity(patches.len());
    for patch in &patches {
        warnings_by_patch.push(validate_and_warn(
            &state,
            patch.pallet_count.unwrap_or(0),
            &patch.start_time.clone().flatten(),
            &patch.end_time.clone().flatten(),
            patch.driver_id.flatten(),
            patch.date,
        )?);
    }
    let created = state.store.bulk_create_missions(&patches, &ctx.user.username)?;
    audit(
        &state,
        &ctx,
        AuditAction::BulkCreate,
        "mission",
        None,
        None,
        Some(serde_json::to_value(&created)?),
        client_ip(&headers),
    );
    state.hub.publish_refresh_required(Some("missions"));
    let response = created
        .into_iter()
        .zip(warnings_by_patch)
        .map(|(mission, warnings)| MissionWriteResponse { mission, warnings })
        .collect();
    Ok(Json(response))
}
