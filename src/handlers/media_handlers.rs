//! Anonymous downloads of public-read objects (thumbnails, large renditions).
//! Bodies are streamed from disk.

use crate::{
    errors::AppError,
    models::{bucket::BucketAccess, object::Object},
    services::storage_service::StorageError,
    state::AppState,
};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, header},
    response::Response,
};
use tokio_util::io::ReaderStream;

/// GET `/media/{bucket}/{*key}`
///
/// Objects in private buckets, unknown buckets and malformed names are all
/// reported as missing.
pub async fn get_media(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let missing = || {
        AppError::not_found(format!(
            "object `{}` not found in bucket `{}`",
            key, bucket
        ))
    };

    let bucket_rec = state
        .objects
        .fetch_bucket(&bucket)
        .await
        .map_err(|err| media_error(err, missing))?;
    if bucket_rec.access != BucketAccess::PublicRead {
        return Err(missing());
    }

    let (_, meta, file) = state
        .objects
        .get_object_reader(&bucket, &key)
        .await
        .map_err(|err| media_error(err, missing))?;
    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    set_object_headers(response.headers_mut(), &meta);
    Ok(response)
}

/// Backend failures keep their status; everything else is a plain 404.
fn media_error(err: StorageError, missing: impl FnOnce() -> AppError) -> AppError {
    match err {
        StorageError::Sqlx(_) | StorageError::Io(_) => AppError::from(err),
        _ => missing(),
    }
}

fn set_object_headers(headers: &mut HeaderMap, meta: &Object) {
    let content_type = meta
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(meta.size_bytes.max(0)));

    if let Some(etag) = meta.etag.as_ref() {
        if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", etag)) {
            headers.insert(header::ETAG, value);
        }
    }
    if let Ok(value) = HeaderValue::from_str(&meta.last_modified.to_rfc2822()) {
        headers.insert(header::LAST_MODIFIED, value);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );
}
