//! Multipart intake shared by image uploads, gallery and brochure routes.

use axum::{
    extract::{Multipart, Path, Request, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use common::types::ApiEnvelope;
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use service::storage::Record;
use service::uploads::{self, StoredUpload, UploadKind, UploadedFile};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{info, warn};

use crate::errors::JsonApiError;
use crate::routes::proxy::{authorization, envelope, require_admin};
use crate::state::AppState;

/// The file part of a form plus any plain text fields sent alongside it.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: Record,
}

/// Read the whole form. The first part named after one of `kind`'s field
/// names becomes the file; other text parts are collected as fields.
pub async fn read_form(mut multipart: Multipart, kind: UploadKind) -> Result<UploadForm, JsonApiError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| JsonApiError::new(e.status(), "Upload Failed", Some(e.body_text())))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let is_file_field = kind.field_names().contains(&name.as_str());
        if is_file_field && form.file.is_none() {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| JsonApiError::new(e.status(), "Upload Failed", Some(e.body_text())))?;
            form.file = Some(UploadedFile { file_name, content_type, bytes: bytes.to_vec() });
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| JsonApiError::new(e.status(), "Upload Failed", Some(e.body_text())))?;
            form.fields.insert(name, Value::String(text));
        }
    }
    Ok(form)
}

/// Extract and validate the file part; a missing part is a 400.
pub fn require_file(form: &mut UploadForm, kind: UploadKind, state: &AppState) -> Result<UploadedFile, JsonApiError> {
    let file = form.file.take().ok_or_else(|| {
        JsonApiError::bad_request(format!("missing file field (expected one of: {})", kind.field_names().join(", ")))
    })?;
    uploads::validate(kind, &file, &state.config.uploads)?;
    Ok(file)
}

fn hosted_url(body: &Value) -> Option<String> {
    let data = body.get("data").unwrap_or(body);
    ["url", "image_url", "imageUrl", "secure_url"]
        .iter()
        .find_map(|k| data.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

async fn forward_to_host(state: &AppState, host: &str, kind: UploadKind, file: &UploadedFile, auth: Option<&str>) -> Option<String> {
    let part = Part::bytes(file.bytes.clone())
        .file_name(uploads::sanitize_file_name(&file.file_name))
        .mime_str(&file.content_type)
        .ok()?;
    let form = Form::new().part("file", part).text("folder", kind.dir_name());
    match state.backend.send_multipart(host, form, auth).await {
        Ok(resp) if resp.is_success() => {
            let url = hosted_url(&resp.body);
            if url.is_none() {
                warn!(resource = "uploads", event = "image_host_no_url", "image host reply carried no url");
            }
            url
        }
        Ok(resp) => {
            warn!(resource = "uploads", event = "image_host_rejected", status = resp.status, "image host refused upload");
            None
        }
        Err(e) => {
            warn!(resource = "uploads", event = "image_host_unreachable", error = %e, "image host unreachable");
            None
        }
    }
}

/// Where an image ended up. `local` is set when the copy lives in our uploads directory.
#[derive(Debug)]
pub struct StoredImage {
    pub url: String,
    pub local: Option<StoredUpload>,
}

/// Store an already validated image: on the image host when one is configured
/// and answering, otherwise under the local uploads directory (admin only).
pub async fn store_image(state: &AppState, headers: &HeaderMap, kind: UploadKind, file: &UploadedFile) -> Result<StoredImage, JsonApiError> {
    if let Some(host) = state.config.uploads.image_host_url.as_deref() {
        if let Some(url) = forward_to_host(state, host, kind, file, authorization(headers)).await {
            info!(resource = "uploads", event = "hosted", kind = kind.dir_name(), %url, "image stored on host");
            return Ok(StoredImage { url, local: None });
        }
    }
    require_admin(headers)?;
    let stored = state.uploads.save(kind, file).await?;
    Ok(StoredImage { url: stored.url.clone(), local: Some(stored) })
}

/// `POST /uploads/:kind` for thumbnails, banners and profile pictures.
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(kind): Path<String>,
    multipart: Multipart,
) -> Result<Response, JsonApiError> {
    let kind = UploadKind::parse(&kind)
        .filter(|k| matches!(k, UploadKind::Thumbnail | UploadKind::Banner | UploadKind::Profile))
        .ok_or_else(|| JsonApiError::bad_request(format!("unknown upload kind '{kind}'")))?;

    let mut form = read_form(multipart, kind).await?;
    let file = require_file(&mut form, kind, &state)?;
    let image = store_image(&state, &headers, kind, &file).await?;

    let data = json!({ "url": image.url, "kind": kind.dir_name(), "size": file.bytes.len() });
    Ok(envelope(StatusCode::CREATED, ApiEnvelope::ok(data).with_message("File uploaded")))
}

/// `GET /uploads/:kind/:file`, serving files written by [`store_image`] and the brochure route.
pub async fn serve(
    State(state): State<AppState>,
    Path((dir, file)): Path<(String, String)>,
    req: Request,
) -> Result<Response, JsonApiError> {
    let known = UploadKind::parse(&dir).map_or(false, |k| k.dir_name() == dir);
    if !known || file != uploads::sanitize_file_name(&file) {
        return Err(JsonApiError::not_found("file"));
    }
    let path = state.uploads.root().join(&dir).join(&file);
    match ServeFile::new(path).oneshot(req).await {
        Ok(res) => Ok(res.into_response()),
        Err(never) => match never {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hosted_url_reads_common_reply_shapes() {
        assert_eq!(hosted_url(&json!({"url": "https://img/a.png"})).as_deref(), Some("https://img/a.png"));
        assert_eq!(hosted_url(&json!({"data": {"imageUrl": "https://img/b.png"}})).as_deref(), Some("https://img/b.png"));
        assert_eq!(hosted_url(&json!({"ok": true})), None);
    }
}
