//! Shared plumbing for proxy handlers: relaying upstream replies, deciding
//! when to fall back, and reading caller credentials.

use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::backend::BackendResponse;
use common::jwt::{role_from_authorization, Role};
use common::types::ApiEnvelope;
use common::CoreError;
use serde_json::Value;
use tracing::warn;

use crate::errors::JsonApiError;

pub fn status_of(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY)
}

pub fn envelope(status: StatusCode, body: ApiEnvelope) -> Response {
    (status, Json(body)).into_response()
}

/// Mirror the upstream status; success bodies go through `map`, failures keep the upstream message.
pub fn relay(resp: BackendResponse, map: impl Fn(&Value) -> Value) -> Response {
    let status = status_of(resp.status);
    if resp.is_success() {
        let mut body = ApiEnvelope::ok(map(resp.data()));
        body.message = resp.message();
        envelope(status, body)
    } else {
        let message = resp.message().unwrap_or_else(|| status.canonical_reason().unwrap_or("Upstream Error").to_string());
        envelope(status, ApiEnvelope::fail(message, None))
    }
}

/// Relay a reply or turn a transport failure into 502. Used where no fallback exists.
pub fn relay_or_bad_gateway(result: Result<BackendResponse, CoreError>, map: impl Fn(&Value) -> Value) -> Response {
    match result {
        Ok(resp) => relay(resp, map),
        Err(e) => JsonApiError::from(e).into_response(),
    }
}

/// 404 ("not implemented upstream yet") and 5xx replies trigger local fallback, as does an
/// unreachable backend. Other 4xx replies are the backend rejecting the request and are relayed.
pub fn is_fallback_status(status: u16) -> bool {
    status == 404 || status >= 500
}

/// Log why a handler is about to serve locally.
pub fn log_fallback(resource: &str, result: &Result<BackendResponse, CoreError>) {
    common::metrics::record_fallback(resource);
    match result {
        Err(e) if e.is_unreachable() => {
            warn!(%resource, event = "local_fallback", error = %e, "backend unreachable; using local storage")
        }
        Err(e) => warn!(%resource, event = "local_fallback", error = %e, "backend reply unreadable; using local storage"),
        Ok(resp) => warn!(%resource, event = "local_fallback", status = resp.status, "backend refused; using local storage"),
    }
}

pub fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()).filter(|v| !v.trim().is_empty())
}

/// Require a bearer token whose claims carry the ADMIN role.
/// Only checked for writes served locally; the backend verifies tokens itself.
pub fn require_admin(headers: &HeaderMap) -> Result<(), JsonApiError> {
    let Some(auth) = authorization(headers) else {
        return Err(JsonApiError::unauthorized("missing bearer token"));
    };
    match role_from_authorization(auth) {
        Some(Role::Admin) => Ok(()),
        Some(other) => Err(JsonApiError::forbidden(format!("role {} may not modify content", other.as_str()))),
        None => Err(JsonApiError::unauthorized("token carries no role")),
    }
}

/// Request body must be a JSON object.
pub fn object_body(body: Value) -> Result<service::storage::Record, JsonApiError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(JsonApiError::bad_request("request body must be a JSON object")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fallback_only_for_404_and_5xx() {
        assert!(is_fallback_status(404));
        assert!(is_fallback_status(500));
        assert!(is_fallback_status(503));
        assert!(!is_fallback_status(400));
        assert!(!is_fallback_status(401));
        assert!(!is_fallback_status(201));
    }

    #[test]
    fn failures_keep_upstream_message_and_status() {
        let resp = BackendResponse { status: 422, body: json!({"message": "slug taken"}) };
        let res = relay(resp, Value::clone);
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn admin_guard_reads_role_claim() {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine;
        let token = |claims: Value| format!("Bearer h.{}.s", URL_SAFE_NO_PAD.encode(claims.to_string()));

        let mut headers = HeaderMap::new();
        assert_eq!(require_admin(&headers).unwrap_err().status, StatusCode::UNAUTHORIZED);
        headers.insert(AUTHORIZATION, token(json!({"role": 2})).parse().unwrap());
        assert_eq!(require_admin(&headers).unwrap_err().status, StatusCode::FORBIDDEN);
        headers.insert(AUTHORIZATION, token(json!({"role": "ADMIN"})).parse().unwrap());
        assert!(require_admin(&headers).is_ok());
    }
}
