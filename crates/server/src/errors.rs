use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::{types::ApiEnvelope, CoreError};
use service::errors::ServiceError;
use tracing::error;

/// Handler error rendered as the canonical `{ success: false, message, error }` envelope.
#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub message: String,
    pub detail: Option<String>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, detail: Option<String>) -> Self {
        Self { status, message: message.into(), detail }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Validation Error", Some(detail.into()))
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized", Some(detail.into()))
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "Forbidden", Some(detail.into()))
    }

    pub fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not Found", Some(format!("{what} not found")))
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        let body = ApiEnvelope::fail(self.message, self.detail);
        (self.status, Json(body)).into_response()
    }
}

impl From<ServiceError> for JsonApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(msg) => JsonApiError::bad_request(msg),
            ServiceError::NotFound(msg) => JsonApiError::new(StatusCode::NOT_FOUND, "Not Found", Some(msg)),
            ServiceError::Conflict(msg) => JsonApiError::new(StatusCode::CONFLICT, "Conflict", Some(msg)),
            ServiceError::Storage(msg) => {
                error!(error = %msg, "local storage failure");
                JsonApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Storage Failed", Some(msg))
            }
            ServiceError::Upstream(e) => e.into(),
        }
    }
}

impl From<CoreError> for JsonApiError {
    fn from(e: CoreError) -> Self {
        JsonApiError::new(StatusCode::BAD_GATEWAY, "Backend Unavailable", Some(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT),
            (ServiceError::Storage("disk full".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (ServiceError::Upstream(CoreError::Network("refused".into())), StatusCode::BAD_GATEWAY),
        ];
        for (err, status) in cases {
            assert_eq!(JsonApiError::from(err).status, status);
        }
    }
}
