//! Course registrations and batch enrollments. Submissions are never lost:
//! when the backend cannot take them they are kept locally and the visitor
//! still gets a success reply.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use common::backend::{BackendRequest, BackendResponse};
use common::types::ApiEnvelope;
use common::CoreError;
use serde_json::{json, Value};
use service::file::enrollments::{Enrollment, EnrollmentInput, EnrollmentStore};
use service::mapping::extract_list;
use tracing::{debug, info};

use crate::errors::JsonApiError;
use crate::routes::proxy::{authorization, envelope, log_fallback, relay, relay_or_bad_gateway, require_admin};
use crate::state::AppState;

pub const COURSE_FALLBACK_MESSAGE: &str = "Registration successful! We will contact you soon.";
pub const BATCH_FALLBACK_MESSAGE: &str = "Enrollment successful! We will contact you soon.";

/// Relay an accepted submission, or keep it locally on any failure.
async fn submit_or_keep(
    resource: &'static str,
    result: Result<BackendResponse, CoreError>,
    store: &EnrollmentStore,
    enrollment: &Enrollment,
    message: &str,
) -> Result<Response, JsonApiError> {
    match result {
        Ok(resp) if resp.is_success() => {
            info!(resource, event = "submitted_upstream", status = resp.status, "enrollment accepted by backend");
            Ok(relay(resp, Value::clone))
        }
        other => {
            log_fallback(resource, &other);
            let rec = store.add_submission(enrollment).await?;
            info!(resource, event = "stored_locally", id = %rec.get("id").cloned().unwrap_or_default(), "enrollment kept locally");
            Ok(envelope(StatusCode::CREATED, ApiEnvelope::ok(Value::Object(rec)).with_message(message)))
        }
    }
}

pub async fn create_course_enrollment(
    State(state): State<AppState>,
    Json(input): Json<EnrollmentInput>,
) -> Result<Response, JsonApiError> {
    let enrollment = input.validate()?;
    let req = BackendRequest::post("/course-enrollments").json(enrollment.upstream_payload());
    let result = state.backend.send(req).await;
    submit_or_keep("course-enrollments", result, &state.course_enrollments, &enrollment, COURSE_FALLBACK_MESSAGE).await
}

/// Upstream enrollments followed by any still held locally. Local
/// submissions carry contact details and are shown to admins only.
pub async fn list_course_enrollments(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, JsonApiError> {
    let req = BackendRequest::get("/course-enrollments").authorization(authorization(&headers));
    match state.backend.send(req).await {
        Ok(resp) if resp.is_success() => {
            let mut list = extract_list(&resp.body);
            if require_admin(&headers).is_ok() {
                let upstream = list.items.len();
                list.items.extend(local_enrollments(&state).await);
                debug!(resource = "course-enrollments", upstream, total = list.items.len(), "merged local enrollments");
            }
            let data = serde_json::to_value(list).unwrap_or(Value::Null);
            Ok(envelope(StatusCode::OK, ApiEnvelope::ok(data)))
        }
        Ok(resp) if resp.status == 401 || resp.status == 403 => Ok(relay(resp, Value::clone)),
        other => {
            log_fallback("course-enrollments", &other);
            require_admin(&headers)?;
            let data = json!({ "items": local_enrollments(&state).await });
            Ok(envelope(StatusCode::OK, ApiEnvelope::ok(data).with_message("Served from local storage")))
        }
    }
}

async fn local_enrollments(state: &AppState) -> Vec<Value> {
    state.course_enrollments.list().await.into_iter().map(Value::Object).collect()
}

pub async fn get_batch(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    relay_or_bad_gateway(state.backend.send(BackendRequest::get(format!("/batches/{id}"))).await, Value::clone)
}

/// Best effort: the backend's batch record names its course.
async fn batch_course_name(state: &AppState, batch_id: &Value) -> Option<String> {
    let id = match batch_id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let resp = state.backend.send(BackendRequest::get(format!("/batches/{id}"))).await.ok()?;
    if !resp.is_success() {
        return None;
    }
    let data = resp.data();
    data.get("course_name")
        .or_else(|| data.pointer("/course/title"))
        .or_else(|| data.pointer("/course/name"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub async fn create_batch_enrollment(
    State(state): State<AppState>,
    Json(input): Json<EnrollmentInput>,
) -> Result<Response, JsonApiError> {
    let mut enrollment = input.validate()?;
    let Some(batch_id) = enrollment.batch_id.clone() else {
        return Err(JsonApiError::bad_request("batch_id is required"));
    };
    if enrollment.course_name.is_none() {
        enrollment.course_name = batch_course_name(&state, &batch_id).await;
    }
    let req = BackendRequest::post("/batches/enrollments").json(enrollment.upstream_payload());
    let result = state.backend.send(req).await;
    submit_or_keep("batch-enrollments", result, &state.batch_enrollments, &enrollment, BATCH_FALLBACK_MESSAGE).await
}
