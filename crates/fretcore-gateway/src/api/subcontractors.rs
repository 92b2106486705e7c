//! `/sst` (§6) — subcontractors, their tariffs and contact emails.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use fretcore_domain::capability::Capability;
use fretcore_domain::models::audit::AuditAction;
use fretcore_domain::models::subcontractor::{Subcontractor, SubcontractorEmail, SubcontractorTariff};
use fretcore_domain::Error;

use crate::hub::ChangeAction;
use crate::pipeline::{audit, client_ip, ApiResult, Authed};
use crate::state::AppState;
use crate::store::subcontractors::{SubcontractorPatch, TariffPatch};
use crate::wire::{parse_tariff_unit, EmailInput, SubcontractorInput, TariffInput};

#[derive(Debug, Deserialize)]
pub struct ActiveOnlyQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct TariffListQuery {
    pub sst_code: Option<String>,
    pub destination: Option<String>,
    #[serde(default)]
    pub active_only: bool,
}

fn into_patch(input: SubcontractorInput) -> SubcontractorPatch {
    SubcontractorPatch {
        code: input.code,
        name: input.name,
        contact_name: input.contact_name,
        phone: input.phone,
        address: input.address,
    }
}

fn into_tariff_patch(input: TariffInput) -> ApiResult<TariffPatch> {
    Ok(TariffPatch {
        sst_id: input.sst_id,
        unit: input.unit.as_deref().map(parse_tariff_unit).transpose()?,
        destination: input.destination,
        country: input.country,
        price: input.price,
        valid_from: input.valid_from,
        valid_to: input.valid_to,
        is_active: input.is_active,
    })
}

pub async fn list(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Query(q): Query<ActiveOnlyQuery>,
) -> ApiResult<Json<Vec<Subcontractor>>> {
    ctx.require(Capability::ViewFinance)?;
    Ok(Json(state.store.list_subcontractors(q.active_only)?))
}

pub async fn get(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Path(id): Path<i64>,
) -> ApiResult<Json<Subcontractor>> {
    ctx.require(Capability::ViewFinance)?;
    let sst = state.store.get_subcontractor(id)?.ok_or_else(|| Error::NotFound(format!("sst {id}")))?;
    Ok(Json(sst))
}

pub async fn get_by_code(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Path(code): Path<String>,
) -> ApiResult<Json<Subcontractor>> {
    ctx.require(Capability::ViewFinance)?;
    let sst = state.store.get_subcontractor_by_code(&code)?.ok_or_else(|| Error::NotFound(format!("sst {code}")))?;
    Ok(Json(sst))
}

pub async fn create(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Json(body): Json<SubcontractorInput>,
) -> ApiResult<Json<Subcontractor>> {
    ctx.require(Capability::ManageFinance)?;
    let created = state.store.create_subcontractor(&into_patch(body))?;
    audit(
        &state,
        &ctx,
        AuditAction::Create,
        "subcontractor",
        Some(created.id),
        None,
        Some(serde_json::to_value(&created)?),
        client_ip(&headers),
    );
    state.hub.publish_data_changed("subcontractors", ChangeAction::Created, Some(created.id), &ctx.user.username);
    Ok(Json(created))
}

pub async fn update(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<SubcontractorInput>,
) -> ApiResult<Json<Subcontractor>> {
    ctx.require(Capability::ManageFinance)?;
    let before = state.store.get_subcontractor(id)?.ok_or_else(|| Error::NotFound(format!("sst {id}")))?;
    let updated = state.store.update_subcontractor(id, &into_patch(body))?;
    audit(
        &state,
        &ctx,
        AuditAction::Update,
        "subcontractor",
        Some(id),
        Some(serde_json::to_value(&before)?),
        Some(serde_json::to_value(&updated)?),
        client_ip(&headers),
    );
    state.hub.publish_data_changed("subcontractors", ChangeAction::Updated, Some(id), &ctx.user.username);
    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.require(Capability::ManageFinance)?;
    let deleted = state.store.delete_subcontractor(id)?;
    audit(
        &state,
        &ctx,
        AuditAction::Delete,
        "subcontractor",
        Some(id),
        Some(serde_json::to_value(&deleted)?),
        None,
        client_ip(&headers),
    );
    state.hub.publish_data_changed("subcontractors", ChangeAction::Deleted, Some(id), &ctx.user.username);
    Ok(Json(json!({ "status": "deleted", "id": id })))
}

pub async fn tariffs_for(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<SubcontractorTariff>>> {
    ctx.require(Capability::ViewFinance)?;
    Ok(Json(state.store.list_tariffs_by_sst(id)?))
}

pub async fn tariffs_all(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Query(q): Query<TariffListQuery>,
) -> ApiResult<Json<Vec<SubcontractorTariff>>> {
    ctx.require(Capability::ViewFinance)?;
    Ok(Json(state.store.list_all_tariffs(q.sst_code.as_deref(), q.destination.as_deref(), q.active_only)?))
}

pub async fn create_tariff(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Json(body): Json<TariffInput>,
) -> ApiResult<Json<SubcontractorTariff>> {
    ctx.require(Capability::ManageFinance)?;
    let created = state.store.create_tariff(&into_tariff_patch(body)?)?;
    audit(
        &state,
        &ctx,
        AuditAction::Create,
        "tariff",
        Some(created.id),
        None,
        Some(serde_json::to_value(&created)?),
        client_ip(&headers),
    );
    Ok(Json(created))
}

pub async fn update_tariff(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<TariffInput>,
) -> ApiResult<Json<SubcontractorTariff>> {
    ctx.require(Capability::ManageFinance)?;
    let before = state.store.get_tariff(id)?.ok_or_else(|| Error::NotFound(format!("tariff {id}")))?;
    let updated = state.store.update_tariff(id, &into_tariff_patch(body)?)?;
    audit(
        &state,
        &ctx,
        AuditAction::Update,
        "tariff",
        Some(id),
        Some(serde_json::to_value(&before)?),
        Some(serde_json::to_value(&updated)?),
        client_ip(&headers),
    );
    Ok(Json(updated))
}

pub async fn delete_tariff(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.require(Capability::ManageFinance)?;
    state.store.delete_tariff(id)?;
    audit(&state, &ctx, AuditAction::Delete, "tariff", Some(id), None, None, client_ip(&headers));
    Ok(Json(json!({ "status": "deleted", "id": id })))
}

pub async fn emails_for(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<SubcontractorEmail>>> {
    ctx.require(Capability::ViewFinance)?;
    Ok(Json(state.store.list_emails(id)?))
}

pub async fn create_email(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<EmailInput>,
) -> ApiResult<Json<SubcontractorEmail>> {
    ctx.require(Capability::ManageFinance)?;
    let created = state.store.create_email(id, &body.address, body.label)?;
    audit(
        &state,
        &ctx,
        AuditAction::Create,
        "subcontractor_email",
        Some(created.id),
        None,
        Some(serde_json::to_value(&created)?),
        client_ip(&headers),
    );
    Ok(Json(created))
}

pub async fn delete_email(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.require(Capability::ManageFinance)?;
    state.store.delete_email(id)?;
    audit(&state, &ctx, AuditAction::Delete, "subcontractor_email", Some(id), None, None, client_ip(&headers));
    Ok(Json(json!({ "status": "deleted", "id": id })))
}
