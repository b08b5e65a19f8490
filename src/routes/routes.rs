//! Defines the HTTP surface of the image ingestion service.
//!
//! ## Structure
//! - `POST    /upload-image` — authenticated multipart image upload
//! - `GET     /objects/{bucket}/{*key}` — public address of a stored object
//! - `HEAD    /objects/{bucket}/{*key}` — object headers only
//! - `GET     /healthz`, `GET /readyz` — probes
//!
//! The wildcard `*key` allows nested keys like `C1/cover.png`.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        image_handlers::upload_image,
        object_handlers::{get_object, head_object},
    },
    services::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the router for all routes, carrying `AppState` to every handler.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/upload-image", post(upload_image))
        .route("/objects/{bucket}/{*key}", get(get_object).head(head_object))
}

/// Full application: routes, shared state, body limit, CORS and tracing.
///
/// `max_request_bytes` bounds the whole request body; the per-image limit is
/// enforced separately while the file part is read. Preflight `OPTIONS`
/// requests are answered by the CORS layer before routing.
pub fn app(state: AppState, max_request_bytes: usize) -> Router {
    routes()
        .layer(DefaultBodyLimit::max(max_request_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
