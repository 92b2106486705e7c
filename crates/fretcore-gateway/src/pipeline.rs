//! RequestPipeline (C4): the ordered steps every HTTP handler is built
//! from — authenticate, authorize, validate, execute, audit, fan-out,
//! respond (§4.3). The mechanical pieces live here; each handler in
//! `crate::api` supplies only the store call and the audit/fan-out
//! parameters specific to its entity.

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{header, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use fretcore_domain::Error;

use crate::auth_core::AuthContext;
use crate::state::AppState;
use crate::store::audit::AuditEntry;
use crate::store::requests::RequestEntry;

/// Wraps `fretcore_domain::Error` for the `IntoResponse` impl. Step 1/2/3's
/// failures, and any store error surfaced from step 4, flow through this
/// single conversion point — nothing downstream of a handler constructs a
/// status code directly (per the doc comment on `Error::http_status`).
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

/// The literal, user-facing message for each error kind — the inner
/// string, not the prefixed `Display` impl (`Error::Forbidden` displays as
/// `"forbidden: {0}"`, but the wire body must carry just `{0}`; see §8
/// scenario 3's literal `{detail: "Permission '...' requise"}`).
fn detail_message(e: &Error) -> String {
    match e {
        Error::AuthFailed(m) => m.clone(),
        Error::Locked { retry_after_secs } => {
            format!("compte verrouillé; réessayez dans {} minutes", retry_after_secs / 60)
        }
        Error::Forbidden(m) => m.clone(),
        Error::NotFound(m) => m.clone(),
        Error::Validation(m) => m.clone(),
        Error::Conflict(m) => m.clone(),
        Error::Io(e) => e.to_string(),
        Error::Json(e) => e.to_string(),
        Error::Internal(m) => m.clone(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(json!({ "detail": detail_message(&self.0) }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Plain JSON error response helper for call sites that want to build a
/// `Response` directly (e.g. the `/ws` upgrade path, which cannot use
/// `ApiError` once the connection has already upgraded).
pub fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": message.into() }))).into_response()
}

/// Pipeline step 1: resolves the bearer token into a validated
/// [`AuthContext`]. Every protected handler takes this as an extractor
/// argument; step 2 (`ctx.require(capability)`) is then a single line in
/// the handler body.
pub struct Authed(pub AuthContext);

#[async_trait]
impl FromRequestParts<AppState> for Authed {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| ApiError(Error::AuthFailed("missing bearer token".into())))?;
        let ctx = state.auth.validate_token(&token)?;
        Ok(Authed(ctx))
    }
}

pub fn bearer_token(parts: &Parts) -> Option<String> {
    bearer_token_from_headers(&parts.headers)
}

pub fn bearer_token_from_headers(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
}

/// Best-effort originating IP from `X-Forwarded-For`, for audit entries and
/// login bookkeeping. Shared with [`record_request`]'s own extraction.
pub fn client_ip(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
}

/// Convenience for pipeline step 5: appends an audit record for a
/// mutating call. `before`/`after` follow §4.3: updates carry both,
/// creates carry only `after`, deletes carry only `before`.
pub fn audit(
    state: &AppState,
    ctx: &AuthContext,
    action: fretcore_domain::models::audit::AuditAction,
    entity_kind: &str,
    entity_id: Option<i64>,
    before: Option<serde_json::Value>,
    after: Option<serde_json::Value>,
    client_ip: Option<String>,
) {
    let entry = AuditEntry {
        username: ctx.user.username.clone(),
        session_id: Some(ctx.session.session_id.clone()),
        action,
        entity_kind: Some(entity_kind.to_string()),
        entity_id,
        before,
        after,
        client_ip,
    };
    if let Err(e) = state.store.append_audit(&entry) {
        tracing::warn!(error = %e, entity_kind, "audit append failed");
    }
}

/// Pipeline step 7: records one `RequestRecord` per completed HTTP call,
/// independent of any domain transaction for the same request. Wraps the
/// whole router so it also covers public endpoints and failed requests.
/// The username is resolved best-effort from the bearer token — this is a
/// second, cheap JWT decode purely for the operational log; handlers
/// still do their own authentication via the [`Authed`] extractor.
pub async fn record_request(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    let start = std::time::Instant::now();
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|s| s.to_string());
    let request_client_ip = client_ip(req.headers());
    let username = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| state.auth.validate_token(token).ok())
        .map(|ctx| ctx.user.username);

    let response = next.run(req).await;

    let status_code = response.status().as_u16() as i64;
    let response_time_ms = start.elapsed().as_millis() as i64;
    let error = if status_code >= 400 { Some(format!("status {status_code}")) } else { None };

    let entry = RequestEntry {
        method,
        path,
        query,
        username,
        client_ip: request_client_ip,
        status_code,
        response_time_ms,
        error,
    };
    if let Err(e) = state.store.record_request(&entry) {
        tracing::warn!(error = %e, "request record failed");
    }

    response
}
