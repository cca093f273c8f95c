use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::object_store::{ObjectStoreError, Storage};
use crate::AppState;

/// Serve an uploaded object by name.
/// Route: GET /static/:name
pub async fn serve_static(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let store = match state.uploads.storage() {
        Storage::Ready(store) => store,
        Storage::Unavailable { .. } => {
            return Err(ApiError::unavailable("Object storage is unavailable"))
        }
    };

    let data = store.get(&name).await.map_err(|e| match e {
        ObjectStoreError::NotFound(_) | ObjectStoreError::InvalidName(_) => {
            ApiError::not_found("File not found")
        }
        _ => ApiError::internal(format!("Failed to retrieve file: {e}")),
    })?;

    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();

    let mime_type = mime_guess::from_path(&name).first_or_octet_stream();
    headers.insert(
        header::CONTENT_TYPE,
        mime_type
            .as_ref()
            .parse()
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );

    // Object names are never reused
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=3600"),
    );

    Ok(response)
}
