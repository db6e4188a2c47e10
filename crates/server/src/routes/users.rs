use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use common::backend::BackendRequest;
use common::types::ApiEnvelope;
use serde_json::Value;
use service::file::users::{normalize_role, normalize_user};
use service::ids::RecordId;
use service::mapping::{canonical_list, canonicalize_user};
use service::pagination::ListQuery;
use service::storage::Record;

use crate::errors::JsonApiError;
use crate::routes::fallback::{created_locally, local_delete, local_get, local_list, local_update};
use crate::routes::proxy::{
    authorization, envelope, is_fallback_status, log_fallback, object_body, relay, require_admin,
};
use crate::state::AppState;

const CACHE_PREFIX: &str = "/users";

fn matches_search(rec: &Record, search: Option<&str>) -> bool {
    let Some(needle) = search.map(str::trim).filter(|s| !s.is_empty()) else {
        return true;
    };
    let needle = needle.to_lowercase();
    ["name", "first_name", "last_name", "email"]
        .iter()
        .filter_map(|k| rec.get(*k).and_then(Value::as_str))
        .any(|v| v.to_lowercase().contains(&needle))
}

/// Local user records carry emails, so the fallback listing is admin only.
pub async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<ListQuery>,
) -> Result<Response, JsonApiError> {
    let req = BackendRequest::get("/users").query(q.to_query_pairs()).authorization(authorization(&headers));
    match state.backend.send(req).await {
        Ok(resp) if !is_fallback_status(resp.status) => {
            if resp.is_success() {
                let data = serde_json::to_value(canonical_list(&resp.body, canonicalize_user)).unwrap_or(Value::Null);
                Ok(envelope(StatusCode::OK, ApiEnvelope::ok(data)))
            } else {
                Ok(relay(resp, Value::clone))
            }
        }
        other => {
            log_fallback("users", &other);
            require_admin(&headers)?;
            let items = state
                .users
                .records()
                .get_all()
                .await
                .into_iter()
                .filter(|r| matches_search(r, q.search.as_deref()))
                .map(|r| canonicalize_user(&Value::Object(r)))
                .collect();
            let (items, page) = q.paginate(items);
            Ok(local_list(items, page))
        }
    }
}

/// Public instructor directory; cached because the site renders it on every course page.
pub async fn instructors(State(state): State<AppState>) -> Response {
    let key = "/users/instructors";
    if let Some(cached) = state.cache.get(key).await {
        return envelope(StatusCode::OK, ApiEnvelope::ok(cached));
    }
    match state.backend.send(BackendRequest::get(key)).await {
        Ok(resp) if resp.is_success() => {
            let data = serde_json::to_value(canonical_list(&resp.body, canonicalize_user)).unwrap_or(Value::Null);
            state.cache.put(key.to_string(), data.clone()).await;
            envelope(StatusCode::OK, ApiEnvelope::ok(data))
        }
        Ok(resp) if !is_fallback_status(resp.status) => relay(resp, Value::clone),
        other => {
            log_fallback("users", &other);
            let items: Vec<Value> = state
                .users
                .instructors()
                .await
                .into_iter()
                .map(|r| canonicalize_user(&Value::Object(r)))
                .collect();
            let (items, page) = ListQuery { limit: Some(100), ..ListQuery::default() }.paginate(items);
            local_list(items, page)
        }
    }
}

pub async fn get(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> Result<Response, JsonApiError> {
    let req = BackendRequest::get(format!("/users/{id}")).authorization(authorization(&headers));
    match state.backend.send(req).await {
        Ok(resp) if !is_fallback_status(resp.status) => Ok(relay(resp, canonicalize_user)),
        other => {
            log_fallback("users", &other);
            require_admin(&headers)?;
            local_get(state.users.records().as_ref(), &RecordId::parse(&id)).await
        }
    }
}

pub async fn create(State(state): State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Result<Response, JsonApiError> {
    let mut input = object_body(body)?;
    normalize_user(&mut input)?;

    let req = BackendRequest::post("/users").json(Value::Object(input.clone())).authorization(authorization(&headers));
    match state.backend.send(req).await {
        Ok(resp) if !is_fallback_status(resp.status) => {
            if resp.is_success() {
                state.cache.invalidate_prefix(CACHE_PREFIX).await;
            }
            Ok(relay(resp, canonicalize_user))
        }
        other => {
            log_fallback("users", &other);
            require_admin(&headers)?;
            let rec = state.users.create(input).await?;
            state.cache.invalidate_prefix(CACHE_PREFIX).await;
            Ok(created_locally(rec))
        }
    }
}

pub async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Response, JsonApiError> {
    let mut patch = object_body(body)?;
    normalize_role(&mut patch)?;

    let req = BackendRequest::put(format!("/users/{id}"))
        .json(Value::Object(patch.clone()))
        .authorization(authorization(&headers));
    match state.backend.send(req).await {
        Ok(resp) if !is_fallback_status(resp.status) => {
            if resp.is_success() {
                state.cache.invalidate_prefix(CACHE_PREFIX).await;
            }
            Ok(relay(resp, canonicalize_user))
        }
        other => {
            log_fallback("users", &other);
            let res = local_update(state.users.records().as_ref(), &headers, &RecordId::parse(&id), patch).await;
            state.cache.invalidate_prefix(CACHE_PREFIX).await;
            res
        }
    }
}

pub async fn delete(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> Result<Response, JsonApiError> {
    let req = BackendRequest::delete(format!("/users/{id}")).authorization(authorization(&headers));
    match state.backend.send(req).await {
        Ok(resp) if !is_fallback_status(resp.status) => {
            if resp.is_success() {
                state.cache.invalidate_prefix(CACHE_PREFIX).await;
            }
            Ok(relay(resp, Value::clone))
        }
        other => {
            log_fallback("users", &other);
            let res = local_delete(state.users.records().as_ref(), &headers, &RecordId::parse(&id)).await;
            state.cache.invalidate_prefix(CACHE_PREFIX).await;
            res
        }
    }
}
