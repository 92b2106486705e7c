//! `/health`, `/server-info`, `/openapi.json` (§6) — the unauthenticated
//! surface. `openapi_spec` is a hand-built OpenAPI 3.0.3 document mirroring
//! the routes wired in `crate::api::router`.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let uptime_seconds = state.started_at.elapsed().as_secs();
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "uptime_seconds": uptime_seconds,
        "uptime_formatted": format_uptime(uptime_seconds),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn server_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "name": "fretcore",
        "version": env!("CARGO_PKG_VERSION"),
        "host": state.config.server.host,
        "port": state.config.server.port,
    }))
}

fn path_item(summary: &str, tags: &[&str]) -> serde_json::Value {
    json!({ "summary": summary, "tags": tags, "security": [{"BearerAuth": []}], "responses": {"200": {"description": "OK"}} })
}

fn public_path_item(summary: &str, tags: &[&str]) -> serde_json::Value {
    json!({ "summary": summary, "tags": tags, "responses": {"200": {"description": "OK"}} })
}

pub async fn openapi_spec() -> impl IntoResponse {
    let spec = json!({
        "openapi": "3.0.3",
        "info": {
            "title": "fretcore API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Freight transport planning and dispatch API.",
        },
        "servers": [{"url": "/"}],
        "components": {
            "securitySchemes": {
                "BearerAuth": { "type": "http", "scheme": "bearer", "bearerFormat": "JWT" }
            }
        },
        "tags": [
            {"name": "auth"}, {"name": "missions"}, {"name": "routes"}, {"name": "drivers"},
            {"name": "subcontractors"}, {"name": "finance"}, {"name": "stats"}, {"name": "admin"},
            {"name": "system"},
        ],
        "paths": {
            "/auth/login": {"post": public_path_item("Authenticate and obtain a session token", &["auth"])},
            "/auth/refresh": {"post": path_item("Issue a new token, revoking the old one", &["auth"])},
            "/auth/logout": {"post": path_item("Revoke the current session", &["auth"])},
            "/auth/change-password": {"post": path_item("Change the current user's password", &["auth"])},
            "/auth/me": {"get": path_item("Describe the current user", &["auth"])},
            "/missions": {
                "get": path_item("List missions", &["missions"]),
                "post": path_item("Create a mission", &["missions"]),
            },
            "/missions/{id}": {
                "get": path_item("Get a mission", &["missions"]),
                "put": path_item("Update a mission", &["missions"]),
                "delete": path_item("Delete a mission", &["missions"]),
            },
            "/missions/bulk": {"post": path_item("Create multiple missions", &["missions"])},
            "/missions/date/{date}": {"get": path_item("List missions for a date", &["missions"])},
            "/voyages": {
                "get": path_item("List routes", &["routes"]),
                "post": path_item("Create a route", &["routes"]),
            },
            "/voyages/{id}": {
                "get": path_item("Get a route", &["routes"]),
                "put": path_item("Update a route", &["routes"]),
                "delete": path_item("Delete a route", &["routes"]),
            },
            "/chauffeurs": {
                "get": path_item("List drivers", &["drivers"]),
                "post": path_item("Create a driver", &["drivers"]),
            },
            "/chauffeurs/{id}": {
                "get": path_item("Get a driver", &["drivers"]),
                "put": path_item("Update a driver", &["drivers"]),
                "delete": path_item("Delete a driver", &["drivers"]),
            },
            "/chauffeurs/{id}/unavailabilities": {"get": path_item("List unavailability windows", &["drivers"])},
            "/chauffeurs/available/{date}": {"get": path_item("Partition drivers by availability", &["drivers"])},
            "/sst": {
                "get": path_item("List subcontractors", &["subcontractors"]),
                "post": path_item("Create a subcontractor", &["subcontractors"]),
            },
            "/sst/{id}": {
                "get": path_item("Get a subcontractor", &["subcontractors"]),
                "put": path_item("Update a subcontractor", &["subcontractors"]),
                "delete": path_item("Delete a subcontractor", &["subcontractors"]),
            },
            "/sst/tariffs": {"get": path_item("List tariffs across subcontractors", &["subcontractors"])},
            "/finance/pallet-revenues": {
                "get": path_item("List pallet revenue schedule entries", &["finance"]),
                "post": path_item("Create a pallet revenue entry", &["finance"]),
            },
            "/finance/stats": {"get": path_item("Country-level margin stats for a date range", &["finance"])},
            "/stats/dashboard": {"get": path_item("Operational dashboard counters", &["stats"])},
            "/stats/tables": {"get": path_item("Row counts per table", &["stats"])},
            "/stats/activity": {"get": path_item("Per-user activity breakdown", &["stats"])},
            "/admin/users": {
                "get": path_item("List users", &["admin"]),
                "post": path_item("Create a user", &["admin"]),
            },
            "/admin/users/{id}": {
                "put": path_item("Update a user", &["admin"]),
                "delete": path_item("Deactivate a user", &["admin"]),
            },
            "/admin/users/{id}/reset-password": {"post": path_item("Reset a user's password", &["admin"])},
            "/admin/roles": {"get": path_item("List roles", &["admin"])},
            "/admin/sessions": {"get": path_item("List active sessions", &["admin"])},
            "/admin/sessions/disconnect/{username}": {"post": path_item("Force-disconnect a user", &["admin"])},
            "/admin/sessions/{sid}/kick": {"post": path_item("Revoke a single session", &["admin"])},
            "/admin/sessions/kick-all": {"post": path_item("Revoke every active session", &["admin"])},
            "/admin/backups": {
                "get": path_item("List snapshots", &["admin"]),
                "post": path_item("Create a snapshot", &["admin"]),
            },
            "/admin/backups/restore/{file}": {"post": path_item("Restore a snapshot", &["admin"])},
            "/admin/backups/{file}": {"delete": path_item("Delete a snapshot", &["admin"])},
            "/admin/backups/cleanup": {"post": path_item("Prune snapshots past retention", &["admin"])},
            "/admin/config": {"get": path_item("Inspect the running configuration", &["admin"])},
            "/admin/logs": {"get": path_item("Browse the audit log", &["admin"])},
            "/health": {"get": public_path_item("Liveness and uptime", &["system"])},
            "/server-info": {"get": public_path_item("Server identity", &["system"])},
            "/ws": {"get": public_path_item("Upgrade to the live-sync WebSocket", &["system"])},
            "/ws/status": {"get": public_path_item("Live-sync connection count", &["system"])},
        },
    });
    ([(header::CONTENT_TYPE, "application/json")], Json(spec))
}
