use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::config::CorsConfig;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_size as usize;

    let media = Router::new()
        .route("/", post(handlers::create_media))
        // A static segment shadows `/:id` for every method, so "upload" as a
        // post or media id is routed here too
        .route(
            "/upload",
            post(handlers::upload_media)
                .layer(DefaultBodyLimit::max(upload_limit))
                .get(handlers::list_media_for_upload_post)
                .delete(handlers::delete_media_for_upload_id),
        )
        // GET takes a post id, DELETE a media id
        .route(
            "/:id",
            get(handlers::list_media_by_post).delete(handlers::delete_media),
        )
        .layer(cors_layer(&state.config.cors));

    Router::new()
        .nest("/api/media", media)
        .route("/static/:name", get(handlers::serve_static))
        .route("/_internal/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(config.allowed_origins.clone()))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        // Wildcard headers are not allowed together with credentials
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .max_age(Duration::from_secs(config.max_age_seconds))
}
