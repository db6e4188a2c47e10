use axum::{
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use common::backend::BackendRequest;
use common::types::ApiEnvelope;
use serde_json::Value;
use service::mapping::{canonical_list, canonicalize, GALLERY_FIELDS};
use service::uploads::UploadKind;

use crate::errors::JsonApiError;
use crate::routes::proxy::{authorization, envelope, relay, relay_or_bad_gateway};
use crate::routes::uploads::{read_form, require_file, store_image};
use crate::state::AppState;

const CACHE_KEY: &str = "/gallery";

fn canonical_item(v: &Value) -> Value {
    canonicalize(v, GALLERY_FIELDS)
}

pub async fn list(State(state): State<AppState>) -> Response {
    if let Some(cached) = state.cache.get(CACHE_KEY).await {
        return envelope(StatusCode::OK, ApiEnvelope::ok(cached));
    }
    match state.backend.send(BackendRequest::get("/gallery")).await {
        Ok(resp) if resp.is_success() => {
            let data = serde_json::to_value(canonical_list(&resp.body, canonical_item)).unwrap_or(Value::Null);
            state.cache.put(CACHE_KEY.to_string(), data.clone()).await;
            envelope(StatusCode::OK, ApiEnvelope::ok(data))
        }
        Ok(resp) => relay(resp, Value::clone),
        Err(e) => JsonApiError::from(e).into_response(),
    }
}

/// Store the image first, then register it upstream with its public URL.
/// A local copy is removed again when registration does not succeed.
pub async fn create(State(state): State<AppState>, headers: HeaderMap, multipart: Multipart) -> Result<Response, JsonApiError> {
    let mut form = read_form(multipart, UploadKind::Gallery).await?;
    let file = require_file(&mut form, UploadKind::Gallery, &state)?;
    let image = store_image(&state, &headers, UploadKind::Gallery, &file).await?;

    let mut payload = form.fields;
    payload.insert("image_url".into(), Value::String(image.url));
    let req = BackendRequest::post("/gallery").json(Value::Object(payload)).authorization(authorization(&headers));
    let result = state.backend.send(req).await;
    if matches!(&result, Ok(resp) if resp.is_success()) {
        state.cache.invalidate_prefix(CACHE_KEY).await;
    } else if let Some(local) = &image.local {
        state.uploads.discard(local).await;
    }
    Ok(relay_or_bad_gateway(result, canonical_item))
}

pub async fn delete(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    let req = BackendRequest::delete(format!("/gallery/{id}")).authorization(authorization(&headers));
    let result = state.backend.send(req).await;
    if matches!(&result, Ok(resp) if resp.is_success()) {
        state.cache.invalidate_prefix(CACHE_KEY).await;
    }
    relay_or_bad_gateway(result, Value::clone)
}
