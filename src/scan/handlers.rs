use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use base64ct::{Base64, Encoding};
use bytes::Bytes;
use tracing::{instrument, warn};
use uuid::Uuid;

use super::dto::{ScanBase64Request, ScanByRefRequest};
use super::model::FoodAnalysis;
use super::orchestrator::Upload;
use crate::{
    auth::AuthUser,
    images::{encoder::MAX_IMAGE_BYTES, ImageRef},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/scans", post(scan_multipart)) // multipart field `image`
        .route("/scans/base64", post(scan_base64))
        .route("/scans/by-ref", post(scan_by_ref))
        // base64 inflates by a third
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES * 4 / 3 + 64 * 1024))
}

/// POST /scans (multipart). Every completed scan is a 200; the outcome is in the body.
#[instrument(skip(state, mp))]
pub async fn scan_multipart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> Result<Json<FoodAnalysis>, (StatusCode, String)> {
    let mut upload: Option<(Bytes, Option<String>)> = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if matches!(field.name(), Some("image") | Some("file")) {
            let content_type = field.content_type().map(|s| s.to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
            upload = Some((data, content_type));
            break;
        }
    }
    let Some((body, content_type)) = upload else {
        return Err((StatusCode::BAD_REQUEST, "image is required".into()));
    };
    scan_upload(&state, user_id, body, content_type.as_deref()).await
}

/// POST /scans/base64 { imageB64, contentType? }
#[instrument(skip(state, body))]
pub async fn scan_base64(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<ScanBase64Request>,
) -> Result<Json<FoodAnalysis>, (StatusCode, String)> {
    let b64 = body.image_b64.trim();
    // tolerate data URLs
    let b64 = b64.split_once(";base64,").map_or(b64, |(_, data)| data);
    let bytes = Base64::decode_vec(b64)
        .map_err(|_| (StatusCode::BAD_REQUEST, "invalid base64".to_string()))?;
    scan_upload(&state, user_id, Bytes::from(bytes), body.content_type.as_deref()).await
}

/// POST /scans/by-ref { imageRef }. Only the caller's own uploads are accepted.
#[instrument(skip(state))]
pub async fn scan_by_ref(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<ScanByRefRequest>,
) -> Result<Json<FoodAnalysis>, (StatusCode, String)> {
    let image = ImageRef::parse(&body.image_ref)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    match &image {
        ImageRef::Stored(key) if is_own_upload(key, user_id) => {}
        _ => {
            warn!(%user_id, image_ref = %body.image_ref, "rejected foreign image reference");
            return Err((StatusCode::FORBIDDEN, "image reference not allowed".into()));
        }
    }
    Ok(Json(state.scanner.scan(&image, user_id).await))
}

/// Keys under `scans/<user>/` with no empty, `.` or `..` segments.
fn is_own_upload(key: &str, user_id: Uuid) -> bool {
    let Some(rest) = key.strip_prefix(&format!("scans/{}/", user_id)) else {
        return false;
    };
    rest.split('/')
        .all(|seg| !seg.is_empty() && seg != "." && seg != "..")
}

async fn scan_upload(
    state: &AppState,
    user_id: Uuid,
    body: Bytes,
    content_type: Option<&str>,
) -> Result<Json<FoodAnalysis>, (StatusCode, String)> {
    if body.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "image is empty".into()));
    }
    let upload = Upload {
        body,
        content_type: content_type.map(str::to_string),
    };
    Ok(Json(state.scanner.scan_upload(upload, user_id).await))
}
