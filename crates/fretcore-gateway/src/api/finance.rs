//! `/finance` (§6) — per-pallet revenue schedule and margin reporting.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use fretcore_domain::capability::Capability;
use fretcore_domain::models::audit::AuditAction;
use fretcore_domain::models::subcontractor::PalletRevenue;
use fretcore_domain::Error;

use crate::pipeline::{audit, client_ip, ApiResult, Authed};
use crate::state::AppState;
use crate::store::finance::{CountryFinanceStats, PalletRevenuePatch, PeriodBucketStats};
use crate::wire::PalletRevenueInput;

#[derive(Debug, Deserialize)]
pub struct StatsRangeQuery {
    pub date_debut: NaiveDate,
    pub date_fin: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct MonthlyQuery {
    pub annee: i32,
    pub mois: u32,
}

#[derive(Debug, Deserialize)]
pub struct YearlyQuery {
    pub annee: i32,
}

fn into_patch(input: PalletRevenueInput) -> PalletRevenuePatch {
    PalletRevenuePatch {
        destination: input.destination,
        country: input.country,
        unit_revenue: input.unit_revenue,
        valid_from: input.valid_from,
        valid_to: input.valid_to,
    }
}

pub async fn list(State(state): State<AppState>, Authed(ctx): Authed) -> ApiResult<Json<Vec<PalletRevenue>>> {
    ctx.require(Capability::ViewFinance)?;
    Ok(Json(state.store.list_pallet_revenues()?))
}

pub async fn get(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Path(id): Path<i64>,
) -> ApiResult<Json<PalletRevenue>> {
    ctx.require(Capability::ViewFinance)?;
    let rev = state.store.get_pallet_revenue(id)?.ok_or_else(|| Error::NotFound(format!("revenue {id}")))?;
    Ok(Json(rev))
}

pub async fn by_destination(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Path(destination): Path<String>,
) -> ApiResult<Json<Vec<PalletRevenue>>> {
    ctx.require(Capability::ViewFinance)?;
    Ok(Json(state.store.pallet_revenues_by_destination(&destination)?))
}

pub async fn create(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Json(body): Json<PalletRevenueInput>,
) -> ApiResult<Json<PalletRevenue>> {
    ctx.require(Capability::ManageFinance)?;
    let created = state.store.create_pallet_revenue(&into_patch(body))?;
    audit(
        &state,
        &ctx,
        AuditAction::Create,
        "pallet_revenue",
        Some(created.id),
        None,
        Some(serde_json::to_value(&created)?),
        client_ip(&headers),
    );
    Ok(Json(created))
}

pub async fn update(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<PalletRevenueInput>,
) -> ApiResult<Json<PalletRevenue>> {
    ctx.require(Capability::ManageFinance)?;
    let before = state.store.get_pallet_revenue(id)?.ok_or_else(|| Error::NotFound(format!("revenue {id}")))?;
    let updated = state.store.update_pallet_revenue(id, &into_patch(body))?;
    audit(
        &state,
        &ctx,
        AuditAction::Update,
        "pallet_revenue",
        Some(id),
        Some(serde_json::to_value(&before)?),
        Some(serde_json::to_value(&updated)?),
        client_ip(&headers),
    );
    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.require(Capability::ManageFinance)?;
    state.store.delete_pallet_revenue(id)?;
    audit(&state, &ctx, AuditAction::Delete, "pallet_revenue", Some(id), None, None, client_ip(&headers));
    Ok(Json(json!({ "status": "deleted", "id": id })))
}

pub async fn stats(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Query(q): Query<StatsRangeQuery>,
) -> ApiResult<Json<Vec<CountryFinanceStats>>> {
    ctx.require(Capability::ViewFinance)?;
    Ok(Json(state.store.finance_stats(q.date_debut, q.date_fin)?))
}

pub async fn stats_monthly(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Query(q): Query<MonthlyQuery>,
) -> ApiResult<Json<Vec<PeriodBucketStats>>> {
    ctx.require(Capability::ViewFinance)?;
    Ok(Json(state.store.monthly_stats(q.annee, q.mois)?))
}

pub async fn stats_yearly(
    State(state): State<AppState>,
    Authed(ctx): Authed,
    Query(q): Query<YearlyQuery>,
) -> ApiResult<Json<Vec<PeriodBucketStats>>> {
    ctx.require(Capability::ViewFinance)?;
    Ok(Json(state.store.yearly_stats(q.annee)?))
}
