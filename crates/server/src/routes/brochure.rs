use axum::{
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use common::types::ApiEnvelope;
use serde_json::Value;
use service::uploads::UploadKind;

use crate::errors::JsonApiError;
use crate::routes::proxy::{envelope, require_admin};
use crate::routes::uploads::{read_form, require_file};
use crate::state::AppState;

/// Replace the downloadable brochure. The PDF is kept under the uploads
/// directory and its URL recorded in `brochure-config.json`.
pub async fn upload(State(state): State<AppState>, headers: HeaderMap, multipart: Multipart) -> Result<Response, JsonApiError> {
    require_admin(&headers)?;
    let mut form = read_form(multipart, UploadKind::Brochure).await?;
    let file = require_file(&mut form, UploadKind::Brochure, &state)?;
    let stored = state.uploads.save(UploadKind::Brochure, &file).await?;
    let cfg = match state.brochure.set(stored.url.clone(), file.file_name.clone()).await {
        Ok(cfg) => cfg,
        Err(e) => {
            state.uploads.discard(&stored).await;
            return Err(e.into());
        }
    };
    let data = serde_json::to_value(&cfg).unwrap_or(Value::Null);
    Ok(envelope(StatusCode::CREATED, ApiEnvelope::ok(data).with_message("Brochure uploaded")))
}

pub async fn current(State(state): State<AppState>) -> Result<Response, JsonApiError> {
    let cfg = state.brochure.current().await.ok_or_else(|| JsonApiError::not_found("brochure"))?;
    let data = serde_json::to_value(&cfg).unwrap_or(Value::Null);
    Ok(envelope(StatusCode::OK, ApiEnvelope::ok(data)))
}
