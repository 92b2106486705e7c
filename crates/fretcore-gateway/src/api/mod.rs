//! The axum router: every route named in §6, wired straight onto the
//! handlers in each submodule. Authorization is per-handler (`ctx.require`
//! via the `Authed` extractor) rather than a blanket middleware, since the
//! capability required differs route by route; `record_request` is the one
//! middleware applied globally, so it also sees public endpoints and
//! requests that fail before a handler's own checks run.

pub mod admin;
pub mod auth;
pub mod drivers;
pub mod finance;
pub mod health;
pub mod missions;
pub mod routes;
pub mod stats;
pub mod subcontractors;
pub mod ws;

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::pipeline::record_request;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let app = Router::new()
        // Public
        .route("/health", get(health::health))
        .route("/server-info", get(health::server_info))
        .route("/openapi.json", get(health::openapi_spec))
        .route("/ws", get(ws::upgrade))
        .route("/ws/status", get(ws::status))
        .route("/auth/login", post(auth::login))
        // Auth (bearer-authenticated via the `Authed` extractor)
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/change-password", post(auth::change_password))
        .route("/auth/me", get(auth::me))
        // Missions
        .route("/missions", get(missions::list).post(missions::create))
        .route("/missions/bulk", post(missions::bulk_create))
        .route("/missions/date/:date", get(missions::by_date))
        .route("/missions/:id", get(missions::get).put(missions::update).delete(missions::delete))
        // Routes (voyages)
        .route("/voyages", get(routes::list).post(routes::create))
        .route("/voyages/code/:code", get(routes::get_by_code))
        .route("/voyages/:id", get(routes::get).put(routes::update).delete(routes::delete))
        // Drivers (chauffeurs)
        .route("/chauffeurs", get(drivers::list).post(drivers::create))
        .route("/chauffeurs/code/:code", get(drivers::get_by_code))
        .route("/chauffeurs/available/:date", get(drivers::available_on))
        .route("/chauffeurs/unavailabilities", post(drivers::create_unavailability))
        .route("/chauffeurs/unavailabilities/:id", delete(drivers::delete_unavailability))
        .route("/chauffeurs/:id", get(drivers::get).put(drivers::update).delete(drivers::delete))
        .route("/chauffeurs/:id/unavailabilities", get(drivers::unavailabilities))
        // Subcontractors (sst)
        .route("/sst", get(subcontractors::list).post(subcontractors::create))
        .route("/sst/code/:code", get(subcontractors::get_by_code))
        .route("/sst/tariffs", get(subcontractors::tariffs_all).post(subcontractors::create_tariff))
        .route("/sst/tariffs/:id", put(subcontractors::update_tariff).delete(subcontractors::delete_tariff))
        .route("/sst/:id", get(subcontractors::get).put(subcontractors::update).delete(subcontractors::delete))
        .route("/sst/:id/tariffs", get(subcontractors::tariffs_for))
        .route("/sst/:id/emails", get(subcontractors::emails_for).post(subcontractors::create_email))
        .route("/sst/emails/:id", delete(subcontractors::delete_email))
        // Finance
        .route("/finance/pallet-revenues", get(finance::list).post(finance::create))
        .route("/finance/pallet-revenues/destination/:destination", get(finance::by_destination))
        .route("/finance/pallet-revenues/:id", get(finance::get).put(finance::update).delete(finance::delete))
        .route("/finance/stats", get(finance::stats))
        .route("/finance/stats/monthly", get(finance::stats_monthly))
        .route("/finance/stats/yearly", get(finance::stats_yearly))
        // Stats
        .route("/stats/dashboard", get(stats::dashboard))
        .route("/stats/tables", get(stats::tables))
        .route("/stats/activity", get(stats::activity_users))
        .route("/stats/activity/recent", get(stats::activity_recent))
        .route("/stats/api", get(stats::api_stats))
        .route("/stats/users/:username", get(stats::user_stats))
        // Admin: users & roles
        .route("/admin/users", get(admin::list_users).post(admin::create_user))
        .route("/admin/users/:id", put(admin::update_user).delete(admin::deactivate_user))
        .route("/admin/users/:id/reset-password", post(admin::reset_password))
        .route("/admin/roles", get(admin::list_roles))
        // Admin: sessions
        .route("/admin/sessions", get(admin::list_sessions))
        .route("/admin/sessions/disconnect/:username", post(admin::disconnect_user))
        .route("/admin/sessions/:sid/kick", post(admin::kick_session))
        .route("/admin/sessions/kick-all", post(admin::kick_all_sessions))
        // Admin: backups
        .route("/admin/backups", get(admin::list_backups).post(admin::create_backup))
        .route("/admin/backups/restore/:file", post(admin::restore_backup))
        .route("/admin/backups/:file", delete(admin::delete_backup))
        .route("/admin/backups/cleanup", post(admin::cleanup_backups))
        // Admin: config & logs
        .route("/admin/config", get(admin::show_config))
        .route("/admin/logs", get(admin::logs));

    app.layer(axum::middleware::from_fn_with_state(state.clone(), record_request))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
