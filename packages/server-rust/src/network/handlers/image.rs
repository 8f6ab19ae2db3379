use std::io::ErrorKind;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use super::AppState;
use crate::network::ApiError;

/// `GET /countries/image`: the last rendered summary PNG.
pub async fn summary_image_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = match tokio::fs::read(state.image_path.as_path()).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Err(ApiError::IMAGE_NOT_FOUND),
        Err(err) => return Err(ApiError::Internal(format!("reading summary image: {err}"))),
    };
    Ok(([(header::CONTENT_TYPE, "image/png")], bytes))
}
