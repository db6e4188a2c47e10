use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use common::backend::BackendRequest;
use common::types::ApiEnvelope;
use serde_json::Value;
use service::file::blogs::{apply_blog_defaults, normalize_status};
use service::ids::RecordId;
use service::mapping::{canonical_list, canonicalize, BLOG_FIELDS};
use service::pagination::ListQuery;
use tracing::info;

use crate::errors::JsonApiError;
use crate::routes::fallback::{created_locally, local_delete, local_get, local_list, local_update, LOCAL_NOTICE};
use crate::routes::proxy::{
    authorization, envelope, is_fallback_status, log_fallback, object_body, relay, require_admin,
};
use crate::state::AppState;

const CACHE_PREFIX: &str = "/blogs";

fn canonical_blog(v: &Value) -> Value {
    canonicalize(v, BLOG_FIELDS)
}

/// Only anonymous listings are cached. The local fallback shows drafts to
/// admins only; everyone else sees published posts.
pub async fn list(State(state): State<AppState>, headers: HeaderMap, Query(q): Query<ListQuery>) -> Response {
    let key = q.cache_key(CACHE_PREFIX);
    let anonymous = authorization(&headers).is_none();
    if anonymous {
        if let Some(cached) = state.cache.get(&key).await {
            return envelope(StatusCode::OK, ApiEnvelope::ok(cached));
        }
    }

    let req = BackendRequest::get("/blogs").query(q.to_query_pairs()).authorization(authorization(&headers));
    match state.backend.send(req).await {
        Ok(resp) if resp.is_success() => {
            let data = serde_json::to_value(canonical_list(&resp.body, canonical_blog)).unwrap_or(Value::Null);
            if anonymous {
                state.cache.put(key, data.clone()).await;
            }
            envelope(StatusCode::OK, ApiEnvelope::ok(data))
        }
        Ok(resp) if !is_fallback_status(resp.status) => relay(resp, Value::clone),
        other => {
            log_fallback("blogs", &other);
            let (items, page) = if require_admin(&headers).is_ok() {
                state.blogs.list(&q).await
            } else {
                state.blogs.list_published(&q).await
            };
            local_list(items, page)
        }
    }
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, JsonApiError> {
    match state.backend.send(BackendRequest::get(format!("/blogs/{id}"))).await {
        Ok(resp) if !is_fallback_status(resp.status) => Ok(relay(resp, canonical_blog)),
        other => {
            log_fallback("blogs", &other);
            local_get(state.blogs.records().as_ref(), &RecordId::parse(&id)).await
        }
    }
}

pub async fn get_by_slug(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Response, JsonApiError> {
    match state.backend.send(BackendRequest::get(format!("/blogs/slug/{slug}"))).await {
        Ok(resp) if !is_fallback_status(resp.status) => Ok(relay(resp, canonical_blog)),
        other => {
            log_fallback("blogs", &other);
            let rec = state.blogs.find_by_slug(&slug).await.ok_or_else(|| JsonApiError::not_found("blog"))?;
            Ok(envelope(StatusCode::OK, ApiEnvelope::ok(Value::Object(rec)).with_message(LOCAL_NOTICE)))
        }
    }
}

pub async fn create(State(state): State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Result<Response, JsonApiError> {
    let mut input = object_body(body)?;
    apply_blog_defaults(&mut input)?;

    let req = BackendRequest::post("/blogs").json(Value::Object(input.clone())).authorization(authorization(&headers));
    match state.backend.send(req).await {
        Ok(resp) if !is_fallback_status(resp.status) => {
            if resp.is_success() {
                state.cache.invalidate_prefix(CACHE_PREFIX).await;
                info!(resource = "blogs", event = "created_upstream", "blog created");
            }
            Ok(relay(resp, canonical_blog))
        }
        other => {
            log_fallback("blogs", &other);
            require_admin(&headers)?;
            let rec = state.blogs.create(input).await?;
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
    normalize_status(&mut patch)?;

    let req = BackendRequest::put(format!("/blogs/{id}"))
        .json(Value::Object(patch.clone()))
        .authorization(authorization(&headers));
    match state.backend.send(req).await {
        Ok(resp) if !is_fallback_status(resp.status) => {
            if resp.is_success() {
                state.cache.invalidate_prefix(CACHE_PREFIX).await;
            }
            Ok(relay(resp, canonical_blog))
        }
        other => {
            log_fallback("blogs", &other);
            let res = local_update(state.blogs.records().as_ref(), &headers, &RecordId::parse(&id), patch).await;
            state.cache.invalidate_prefix(CACHE_PREFIX).await;
            res
        }
    }
}

pub async fn delete(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> Result<Response, JsonApiError> {
    let req = BackendRequest::delete(format!("/blogs/{id}")).authorization(authorization(&headers));
    match state.backend.send(req).await {
        Ok(resp) if !is_fallback_status(resp.status) => {
            if resp.is_success() {
                state.cache.invalidate_prefix(CACHE_PREFIX).await;
            }
            Ok(relay(resp, Value::clone))
        }
        other => {
            log_fallback("blogs", &other);
            let res = local_delete(state.blogs.records().as_ref(), &headers, &RecordId::parse(&id)).await;
            state.cache.invalidate_prefix(CACHE_PREFIX).await;
            res
        }
    }
}
