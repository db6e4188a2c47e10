//! Local-storage branches shared by the blog and user handlers.

use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use common::types::ApiEnvelope;
use serde_json::{json, Value};
use service::ids::RecordId;
use service::pagination::PageInfo;
use service::storage::{Record, RecordStore};

use crate::errors::JsonApiError;
use crate::routes::proxy::{envelope, require_admin};

pub const LOCAL_NOTICE: &str = "Served from local storage";

pub fn local_list(items: Vec<Value>, page: PageInfo) -> Response {
    let body = ApiEnvelope::ok(json!({ "items": items, "pagination": page })).with_message(LOCAL_NOTICE);
    envelope(StatusCode::OK, body)
}

pub async fn local_get(store: &dyn RecordStore, id: &RecordId) -> Result<Response, JsonApiError> {
    match store.get_by_id(id).await {
        Some(rec) => Ok(envelope(StatusCode::OK, ApiEnvelope::ok(Value::Object(rec)).with_message(LOCAL_NOTICE))),
        None => Err(JsonApiError::not_found(store.name())),
    }
}

pub async fn local_update(
    store: &dyn RecordStore,
    headers: &HeaderMap,
    id: &RecordId,
    patch: Record,
) -> Result<Response, JsonApiError> {
    require_admin(headers)?;
    match store.update(id, patch).await? {
        Some(rec) => Ok(envelope(StatusCode::OK, ApiEnvelope::ok(Value::Object(rec)).with_message("Updated in local storage"))),
        None => Err(JsonApiError::not_found(store.name())),
    }
}

pub async fn local_delete(store: &dyn RecordStore, headers: &HeaderMap, id: &RecordId) -> Result<Response, JsonApiError> {
    require_admin(headers)?;
    if store.delete(id).await? {
        Ok(envelope(StatusCode::OK, ApiEnvelope::ok_message("Deleted from local storage")))
    } else {
        Err(JsonApiError::not_found(store.name()))
    }
}

pub fn created_locally(rec: Record) -> Response {
    envelope(StatusCode::CREATED, ApiEnvelope::ok(Value::Object(rec)).with_message("Saved to local storage"))
}
