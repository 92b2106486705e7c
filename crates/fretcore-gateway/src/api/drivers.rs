//! `/chauffeurs` (§6) — drivers and their unavailability calendar.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use fretcore_domain::capability::Capability;
use fretcore_domain::models::audit::AuditAction;
use fretcore_domain::models::driver::{Driver, DriverUnavailability};
use fretcore_domain::Error;

use crate::hub::ChangeAction;
use crate::pipeline::{audit, client_ip, ApiResult, Authed};
use crate::state::AppState;
use crate::store::drivers::DriverPatch;
use crate::wire::{parse_unavailability_reason, DriverInput, UnavailabilityInput};

#[derive(Debug, Deserialize)]
pub struct ActiveOnlyQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct UnavailabilityRangeQuery {
    pub date_debut: Option<NaiveDate>,
    pub date_fin: Option<NaiveDate>,
}

fn into_patch(input: DriverInput) -> DriverPatch {
    DriverPatch {
        code: input.code,
        last_name: input.last_name,
        first_name: input.first_name,
        phone: input.phone,
        email: input.email,
        contract_type: input.contract_type,
        hire_date: input.hire_date,
        has_permit: input.has_permit,
        has_adr: input.has_adr,
        has_fimo: input.has_fimo,
        preferred_tractor: input.preferred_tractor,
    }
}

pub async fn list(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Query(q): Query<ActiveOnlyQuery>,
) -> ApiResult<Json<Vec<Driver>>> {
    ctx.require(Capability::ViewDrivers)?;
    Ok(Json(state.store.list_drivers(q.active_only)?))
}

pub async fn get(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Path(id): Path<i64>,
) -> ApiResult<Json<Driver>> {
    ctx.require(Capability::ViewDrivers)?;
    let driver = state.store.get_driver(id)?.ok_or_else(|| Error::NotFound(format!("driver {id}")))?;
    Ok(Json(driver))
}

pub async fn get_by_code(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Path(code): Path<String>,
) -> ApiResult<Json<Driver>> {
    ctx.require(Capability::ViewDrivers)?;
    let driver = state.store.get_driver_by_code(&code)?.ok_or_else(|| Error::NotFound(format!("driver {code}")))?;
    Ok(Json(driver))
}

pub async fn available_on(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Path(date): Path<NaiveDate>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.require(Capability::ViewDrivers)?;
    let partition = state.store.available_drivers_on(date)?;
    Ok(Json(json!({ "disponibles": partition.available, "indisponibles": partition.unavailable })))
}

pub async fn unavailabilities(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Path(id): Path<i64>,
    Query(q): Query<UnavailabilityRangeQuery>,
) -> ApiResult<Json<Vec<DriverUnavailability>>> {
    ctx.require(Capability::ViewDrivers)?;
    Ok(Json(state.store.unavailabilities_for_driver(id, q.date_debut, q.date_fin)?))
}

pub async fn create(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Json(body): Json<DriverInput>,
) -> ApiResult<Json<Driver>> {
    ctx.require(Capability::ManageDrivers)?;
    let created = state.store.create_driver(&into_patch(body))?;
    audit(
        &state,
        &ctx,
        AuditAction::Create,
        "driver",
        Some(created.id),
        None,
        Some(serde_json::to_value(&created)?),
        client_ip(&headers),
    );
    state.hub.publish_data_changed("drivers", ChangeAction::Created, Some(created.id), &ctx.user.username);
    Ok(Json(created))
}

pub async fn update(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<DriverInput>,
) -> ApiResult<Json<Driver>> {
    ctx.require(Capability::ManageDrivers)?;
    let before = state.store.get_driver(id)?.ok_or_else(|| Error::NotFound(format!("driver {id}")))?;
    let updated = state.store.update_driver(id, &into_patch(body))?;
    audit(
        &state,
        &ctx,
        AuditAction::Update,
        "driver",
        Some(id),
        Some(serde_json::to_value(&before)?),
        Some(serde_json::to_value(&updated)?),
        client_ip(&headers),
    );
    state.hub.publish_data_changed("drivers", ChangeAction::Updated, Some(id), &ctx.user.username);
    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.require(Capability::ManageDrivers)?;
    let deleted = state.store.delete_driver(id)?;
    audit(
        &state,
        &ctx,
        AuditAction::Delete,
        "driver",
        Some(id),
        Some(serde_json::to_value(&deleted)?),
        None,
        client_ip(&headers),
    );
    state.hub.publish_data_changed("drivers", ChangeAction::Deleted, Some(id), &ctx.user.username);
    Ok(Json(json!({ "status": "deleted", "id": id })))
}

pub async fn create_unavailability(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Json(body): Json<UnavailabilityInput>,
) -> ApiResult<Json<DriverUnavailability>> {
    ctx.require(Capability::EditDriverPlanning)?;
    let reason = parse_unavailability_reason(&body.reason_code)?;
    let created =
        state.store.create_unavailability(body.driver_id, body.start_date, body.end_date, reason, body.note)?;
    audit(
        &state,
        &ctx,
        AuditAction::Create,
        "driver_unavailability",
        Some(created.id),
        None,
        Some(serde_json::to_value(&created)?),
        client_ip(&headers),
    );
    state.hub.publish_data_changed("drivers", ChangeAction::Updated, Some(body.driver_id), &ctx.user.username);
    Ok(Json(created))
}

pub async fn delete_unavailability(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.require(Capability::EditDriverPlanning)?;
    state.store.delete_unavailability(id)?;
    audit(
        &state,
        &ctx,
        AuditAction::Delete,
        "driver_unavailability",
        Some(id),
        None,
        None,
        client_ip(&headers),
    );
    state.hub.publish_refresh_required(Some("drivers"));
    Ok(Json(json!({ "status": "deleted", "id": id })))
}
