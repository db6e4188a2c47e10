use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use common::backend::BackendRequest;
use serde::Deserialize;
use serde_json::{json, Value};
use service::pagination::ListQuery;
use tracing::info;

use crate::errors::JsonApiError;
use crate::routes::proxy::{authorization, object_body, relay_or_bad_gateway};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubscribeInput {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

fn valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.') && !email.contains(char::is_whitespace)
}

pub async fn subscribe(State(state): State<AppState>, Json(input): Json<SubscribeInput>) -> Result<Response, JsonApiError> {
    let email = input.email.as_deref().map(str::trim).unwrap_or_default().to_lowercase();
    if !valid_email(&email) {
        return Err(JsonApiError::bad_request("a valid email is required"));
    }
    let mut body = json!({ "email": email });
    if let Some(name) = input.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        body["name"] = Value::from(name);
    }
    let result = state.backend.send(BackendRequest::post("/newsletter/subscribe").json(body)).await;
    Ok(relay_or_bad_gateway(result, Value::clone))
}

/// Campaign send. Authenticated with the configured service token, not the caller's.
pub async fn send(State(state): State<AppState>, Json(body): Json<Value>) -> Result<Response, JsonApiError> {
    let body = object_body(body)?;
    let token = state.config.backend.service_token.as_deref().filter(|t| !t.is_empty()).ok_or_else(|| {
        JsonApiError::new(StatusCode::SERVICE_UNAVAILABLE, "Newsletter Disabled", Some("service token not configured".into()))
    })?;
    let bearer = format!("Bearer {token}");
    let req = BackendRequest::post("/newsletter/send").json(Value::Object(body)).authorization(Some(bearer.as_str()));
    let result = state.backend.send(req).await;
    if let Ok(resp) = &result {
        info!(resource = "newsletter", event = "send", status = resp.status, "newsletter send relayed");
    }
    Ok(relay_or_bad_gateway(result, Value::clone))
}

pub async fn subscribers(State(state): State<AppState>, headers: HeaderMap, Query(q): Query<ListQuery>) -> Response {
    let req = BackendRequest::get("/newsletter/subscribers")
        .query(q.to_query_pairs())
        .authorization(authorization(&headers));
    relay_or_bad_gateway(state.backend.send(req).await, Value::clone)
}
