//! HTTP handlers for uploads and individual photos.

use crate::{
    errors::AppError,
    models::photo::PhotoView,
    services::gallery_service::{ProcessOutcome, UploadFile, UploadReport},
    state::AppState,
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use serde::Serialize;
use uuid::Uuid;

#[derive(Serialize)]
pub struct ProcessResponse {
    pub outcome: ProcessOutcome,
    pub photo: PhotoView,
}

/// POST `/uploads`: multipart form with an `album` slug, an optional
/// `author` and any number of `images` files.
pub async fn upload_photos(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadReport>, AppError> {
    let mut album = None;
    let mut author = None;
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("album") => album = Some(field.text().await.map_err(multipart_error)?),
            Some("author") => {
                let text = field.text().await.map_err(multipart_error)?;
                author = Some(text).filter(|a| !a.trim().is_empty());
            }
            Some("images") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_error)?;
                files.push(UploadFile {
                    filename,
                    content_type,
                    data,
                });
            }
            other => tracing::debug!(field = ?other, "ignoring multipart field"),
        }
    }

    let album = album
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .ok_or_else(|| AppError::bad_request("missing `album` field"))?;

    Ok(Json(state.gallery.upload(&album, files, author).await?))
}

/// GET `/photos/{id}`
pub async fn get_photo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PhotoView>, AppError> {
    let photo = state.gallery.get_photo(id).await?;
    Ok(Json(state.gallery.photo_view(photo)))
}

/// DELETE `/photos/{id}`: removes the row, then releases the stored files.
pub async fn delete_photo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.gallery.delete_photo(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/photos/{id}/process`: retry processing of a photo whose upload
/// did not fully process. A no-op for processed photos.
pub async fn process_photo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProcessResponse>, AppError> {
    let (photo, outcome) = state.gallery.process_photo(id).await?;
    Ok(Json(ProcessResponse {
        outcome,
        photo: state.gallery.photo_view(photo),
    }))
}

/// GET `/photos/{id}/original`: the uploaded file from the private bucket.
pub async fn get_original(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let photo = state.gallery.get_photo(id).await?;
    let (data, content_type) = state.gallery.load_original(&photo).await?;

    let mut response = Response::new(Body::from(data));
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, content_type_header(&content_type));
    Ok(response)
}

fn content_type_header(content_type: &str) -> HeaderValue {
    HeaderValue::from_str(content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::new(err.status(), err.body_text())
}
