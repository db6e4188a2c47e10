pub mod auth;
pub mod blogs;
pub mod brochure;
pub mod courses;
pub mod enrollments;
pub mod fallback;
pub mod gallery;
pub mod newsletter;
pub mod proxy;
pub mod uploads;
pub mod users;

use axum::{
    extract::DefaultBodyLimit,
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use common::types::Health;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{error, Level};

use crate::state::AppState;

/// Headroom above the largest upload ceiling for multipart framing and text fields.
const BODY_HEADROOM: u64 = 1024 * 1024;

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn metrics() -> Response {
    match common::metrics::render() {
        Ok(text) => ([(CONTENT_TYPE, "text/plain; version=0.0.4")], text).into_response(),
        Err(e) => {
            error!(error = %e, "metrics encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Build the full application router: proxied resources, local-only routes and static uploads.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let body_limit = (state.config.uploads.max_ceiling() + BODY_HEADROOM) as usize;

    let admin_auth = Router::new()
        .route("/admin/login", post(auth::login))
        .route("/admin/otp/send", post(auth::send_otp))
        .route("/admin/otp/verify", post(auth::verify_otp))
        .route("/admin/otp/resend", post(auth::resend_otp))
        .route("/admin/me", get(auth::me));

    let content = Router::new()
        .route("/blogs", get(blogs::list).post(blogs::create))
        .route("/blogs/slug/:slug", get(blogs::get_by_slug))
        .route("/blogs/:id", get(blogs::get).put(blogs::update).delete(blogs::delete))
        .route("/courses", get(courses::list))
        .route("/courses/:id", get(courses::get))
        .route("/gallery", get(gallery::list).post(gallery::create))
        .route("/gallery/:id", axum::routing::delete(gallery::delete))
        .route("/users", get(users::list).post(users::create))
        .route("/users/instructors", get(users::instructors))
        .route("/users/:id", get(users::get).put(users::update).delete(users::delete));

    let visitors = Router::new()
        .route("/newsletter/subscribe", post(newsletter::subscribe))
        .route("/newsletter/send", post(newsletter::send))
        .route("/newsletter/subscribers", get(newsletter::subscribers))
        .route("/batches/enrollments", post(enrollments::create_batch_enrollment))
        .route("/batches/:id", get(enrollments::get_batch))
        .route(
            "/course-enrollments",
            get(enrollments::list_course_enrollments).post(enrollments::create_course_enrollment),
        );

    let files = Router::new()
        .route("/uploads/:kind", post(uploads::upload))
        .route("/uploads/:kind/:file", get(uploads::serve))
        .route("/brochure", get(brochure::current).post(brochure::upload));

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .merge(admin_auth)
        .merge(content)
        .merge(visitors)
        .merge(files)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                // 5xx 以 ERROR 记录
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
