//! Defines routes for the gallery HTTP surface.
//!
//! ## Structure
//! - **Albums**
//!   - `GET    /albums`: list albums, newest first
//!   - `POST   /albums`: create album
//!   - `GET    /albums/{slug}`: fetch album
//!   - `PATCH  /albums/{slug}`: rename / describe album
//!   - `DELETE /albums/{slug}`: delete album, its photos and their files
//!   - `GET    /albums/{slug}/photos`: list photos, newest first
//!
//! - **Photos**
//!   - `POST   /uploads`: multipart upload into one album
//!   - `GET    /photos/{id}`: fetch photo
//!   - `DELETE /photos/{id}`: delete photo and its files
//!   - `POST   /photos/{id}/process`: run processing again for a photo
//!   - `GET    /photos/{id}/original`: download the original
//!
//! - **Media**
//!   - `GET    /media/{bucket}/{*key}`: public-read objects
//!
//! The wildcard `*key` allows nested keys like `photos/trip/3f2a.jpg`.

use crate::{
    handlers::{
        album_handlers::{
            create_album, delete_album, get_album, list_album_photos, list_albums, update_album,
        },
        health_handlers::{healthz, readyz},
        media_handlers::get_media,
        photo_handlers::{delete_photo, get_original, get_photo, process_photo, upload_photos},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Build the router for every gallery route.
///
/// Upload bodies are capped at `max_upload_bytes`.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        // health endpoints
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // albums
        .route("/albums", get(list_albums).post(create_album))
        .route(
            "/albums/{slug}",
            get(get_album).patch(update_album).delete(delete_album),
        )
        .route("/albums/{slug}/photos", get(list_album_photos))
        // photos
        .route(
            "/uploads",
            post(upload_photos).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/photos/{id}", get(get_photo).delete(delete_photo))
        .route("/photos/{id}/process", post(process_photo))
        .route("/photos/{id}/original", get(get_original))
        // public media
        .route("/media/{bucket}/{*key}", get(get_media))
}
