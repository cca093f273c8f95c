use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson};
use crate::storage::models::{MediaRecord, NewMedia};
use crate::upload::{FileUpload, UploadError};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaResponse {
    pub created_at: String,
    pub id: String,
    pub media_type: Option<String>,
    pub post_id: String,
    pub url: Option<String>,
}

/// Body of `POST /api/media`. Any `id` sent by the client is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMediaRequest {
    pub post_id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
}

impl CreateMediaRequest {
    fn validate(self) -> Result<NewMedia, ApiError> {
        let post_id = self.post_id.trim();
        if post_id.is_empty() {
            return Err(ApiError::bad_request("postId must not be empty"));
        }

        if let Some(ref url) = self.url {
            Url::parse(url)
                .map_err(|_| ApiError::bad_request("url must be an absolute URL"))?;
        }

        Ok(NewMedia {
            post_id: post_id.to_string(),
            url: self.url,
            media_type: self.media_type.filter(|t| !t.trim().is_empty()),
        })
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn list_media_by_post(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<MediaResponse>>, ApiError> {
    list_media(&state, &post_id)
}

/// `GET /upload` shares its path with the upload route; "upload" is a post id here.
pub async fn list_media_for_upload_post(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<MediaResponse>>, ApiError> {
    list_media(&state, UPLOAD_SEGMENT)
}

pub async fn create_media(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CreateMediaRequest>,
) -> Result<(StatusCode, Json<MediaResponse>), ApiError> {
    let new_media = req.validate()?;
    let media = state.db.create_media(new_media)?;

    tracing::debug!(media_id = %media.id, post_id = %media.post_id, "Created media");
    Ok((StatusCode::CREATED, Json(media_to_response(&media))))
}

pub async fn delete_media(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    remove_media(&state, &id)
}

/// `DELETE /upload`, where "upload" is a media id.
pub async fn delete_media_for_upload_id(
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    remove_media(&state, UPLOAD_SEGMENT)
}

pub async fn upload_media(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<String, ApiError> {
    let mut upload: Option<FileUpload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().map(|s| s.to_string());
        let content_type = field.content_type().map(|s| s.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;

        // Only the first file field is uploaded
        upload = Some(FileUpload {
            file_name,
            content_type,
            data,
        });
        break;
    }

    let upload = upload.ok_or_else(|| ApiError::bad_request("file field is required"))?;

    state
        .uploads
        .upload_file(upload)
        .await
        .map_err(|e| match e {
            UploadError::Unavailable(_) => ApiError::unavailable(e.to_string()),
            UploadError::Failed(err) => {
                tracing::warn!(error = %err, "File upload failed");
                ApiError::internal(format!("File upload failed: {err}"))
            }
        })
}

// ============================================================================
// Helpers
// ============================================================================

const UPLOAD_SEGMENT: &str = "upload";

fn list_media(state: &AppState, post_id: &str) -> Result<Json<Vec<MediaResponse>>, ApiError> {
    let media = state.db.find_by_post_id(post_id)?;
    Ok(Json(media.iter().map(media_to_response).collect()))
}

fn remove_media(state: &AppState, id: &str) -> Result<StatusCode, ApiError> {
    // The stored object, if any, is left in the bucket.
    let deleted = state.db.delete_media(id)?;

    tracing::debug!(media_id = %id, deleted, "Deleted media");
    Ok(StatusCode::NO_CONTENT)
}

fn media_to_response(media: &MediaRecord) -> MediaResponse {
    MediaResponse {
        created_at: media.created_at.to_rfc3339(),
        id: media.id.clone(),
        media_type: media.media_type.clone(),
        post_id: media.post_id.clone(),
        url: media.url.clone(),
    }
}
