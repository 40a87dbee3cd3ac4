use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use crate::api::response::{ApiError, AppQuery};
use crate::object_store::ObjectStoreError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BlobParams {
    pub expires: i64,
    pub sig: String,
}

/// Serve an object for a LocalStore capability URL.
/// Route: GET /blob/*key?expires=..&sig=..
///
/// Only meaningful on the local backend -- GCS signed URLs point at GCS
/// directly and never reach this route.
pub async fn serve_blob(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    AppQuery(params): AppQuery<BlobParams>,
) -> Result<Response, ApiError> {
    let Some(local) = &state.local_blobs else {
        return Err(ApiError::not_found("Blob not found"));
    };

    if chrono::Utc::now().timestamp() >= params.expires {
        return Err(ApiError::Fail(
            StatusCode::GONE,
            "link_expired",
            "This link has expired; ask the owner to refresh it".to_string(),
        ));
    }

    if !local.verify_blob_token(&key, params.expires, &params.sig) {
        return Err(ApiError::Fail(
            StatusCode::FORBIDDEN,
            "invalid_signature",
            "Signature does not match this object".to_string(),
        ));
    }

    let file = local.open_reader(&key).await.map_err(|e| match e {
        ObjectStoreError::NotFound(_) => ApiError::not_found("Blob not found"),
        _ => ApiError::internal(format!("Failed to read object: {e}")),
    })?;

    let body = axum::body::Body::from_stream(ReaderStream::new(file));
    let mut response = (StatusCode::OK, body).into_response();
    let headers = response.headers_mut();

    let mime = mime_guess::from_path(&key)
        .first_raw()
        .unwrap_or("application/octet-stream");
    headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static(mime));

    // Set Content-Disposition with filename from the key's last segment
    let filename = key.rsplit('/').next().unwrap_or(&key);
    if let Ok(value) = format!("inline; filename=\"{filename}\"").parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    // Capability URLs are bearer credentials; never cache them in shared caches.
    headers.insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("private, max-age=0"),
    );

    Ok(response)
}
