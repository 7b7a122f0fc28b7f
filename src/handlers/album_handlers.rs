//! HTTP handlers for albums.

use crate::{
    errors::AppError,
    models::{
        album::{Album, AlbumUpdate, NewAlbum},
        photo::PhotoView,
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

/// GET `/albums`: newest first.
pub async fn list_albums(State(state): State<AppState>) -> Result<Json<Vec<Album>>, AppError> {
    Ok(Json(state.gallery.list_albums().await?))
}

/// POST `/albums`: body `{"name": ..., "slug"?: ..., "description"?: ...}`.
pub async fn create_album(
    State(state): State<AppState>,
    Json(new): Json<NewAlbum>,
) -> Result<impl IntoResponse, AppError> {
    let album = state.gallery.create_album(new).await?;
    Ok((StatusCode::CREATED, Json(album)))
}

/// GET `/albums/{slug}`
pub async fn get_album(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Album>, AppError> {
    Ok(Json(state.gallery.get_album(&slug).await?))
}

/// PATCH `/albums/{slug}`
pub async fn update_album(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(update): Json<AlbumUpdate>,
) -> Result<Json<Album>, AppError> {
    Ok(Json(state.gallery.update_album(&slug, update).await?))
}

/// DELETE `/albums/{slug}`: removes the album, its photos and their files.
pub async fn delete_album(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<StatusCode, AppError> {
    state.gallery.delete_album(&slug).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET `/albums/{slug}/photos`: newest first.
pub async fn list_album_photos(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<PhotoView>>, AppError> {
    let photos = state.gallery.list_photos(&slug).await?;
    Ok(Json(
        photos
            .into_iter()
            .map(|p| state.gallery.photo_view(p))
            .collect(),
    ))
}
