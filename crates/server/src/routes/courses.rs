use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::backend::BackendRequest;
use common::types::ApiEnvelope;
use serde_json::Value;
use service::mapping::{canonical_list, canonicalize, COURSE_FIELDS};
use service::pagination::ListQuery;

use crate::errors::JsonApiError;
use crate::routes::proxy::{envelope, relay};
use crate::state::AppState;

fn canonical_course(v: &Value) -> Value {
    canonicalize(v, COURSE_FIELDS)
}

/// Course catalogue, read-only and cached. No local copy exists, so an
/// unreachable backend is a 502.
pub async fn list(State(state): State<AppState>, Query(q): Query<ListQuery>) -> Response {
    let key = q.cache_key("/courses");
    if let Some(cached) = state.cache.get(&key).await {
        return envelope(StatusCode::OK, ApiEnvelope::ok(cached));
    }
    match state.backend.send(BackendRequest::get("/courses").query(q.to_query_pairs())).await {
        Ok(resp) if resp.is_success() => {
            let data = serde_json::to_value(canonical_list(&resp.body, canonical_course)).unwrap_or(Value::Null);
            state.cache.put(key, data.clone()).await;
            envelope(StatusCode::OK, ApiEnvelope::ok(data))
        }
        Ok(resp) => relay(resp, Value::clone),
        Err(e) => JsonApiError::from(e).into_response(),
    }
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let path = format!("/courses/{id}");
    if let Some(cached) = state.cache.get(&path).await {
        return envelope(StatusCode::OK, ApiEnvelope::ok(cached));
    }
    match state.backend.send(BackendRequest::get(path.clone())).await {
        Ok(resp) if resp.is_success() => {
            let data = canonical_course(resp.data());
            state.cache.put(path, data.clone()).await;
            envelope(StatusCode::OK, ApiEnvelope::ok(data))
        }
        Ok(resp) => relay(resp, Value::clone),
        Err(e) => JsonApiError::from(e).into_response(),
    }
}
