//! Admin login and OTP flow. Pure passthrough: an unreachable backend is a 502,
//! never a synthesized success.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use common::backend::BackendRequest;
use common::jwt::{decode_payload, extract_role};
use common::types::ApiEnvelope;
use serde_json::{json, Value};
use tracing::info;

use crate::errors::JsonApiError;
use crate::routes::proxy::{authorization, envelope, relay_or_bad_gateway};
use crate::state::AppState;

async fn forward(state: &AppState, path: &str, body: Value) -> Response {
    let result = state.backend.send(BackendRequest::post(path).json(body)).await;
    if let Ok(resp) = &result {
        info!(resource = "admin_auth", event = "relayed", path, status = resp.status, "auth request relayed");
    }
    relay_or_bad_gateway(result, Value::clone)
}

pub async fn login(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    forward(&state, "/admin/login", body).await
}

pub async fn send_otp(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    forward(&state, "/admin/otp/send", body).await
}

pub async fn verify_otp(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    forward(&state, "/admin/otp/verify", body).await
}

pub async fn resend_otp(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    forward(&state, "/admin/otp/resend", body).await
}

/// Claims of the caller's token as decoded locally, plus the resolved role.
/// Signature is not checked here; the backend remains the authority.
pub async fn me(headers: HeaderMap) -> Result<Response, JsonApiError> {
    let auth = authorization(&headers).ok_or_else(|| JsonApiError::unauthorized("missing bearer token"))?;
    let claims = decode_payload(auth);
    if claims.is_empty() {
        return Err(JsonApiError::unauthorized("malformed token"));
    }
    let role = extract_role(&claims).map(|r| r.as_str());
    let data = json!({ "claims": claims, "role": role });
    Ok(envelope(StatusCode::OK, ApiEnvelope::ok(data)))
}
