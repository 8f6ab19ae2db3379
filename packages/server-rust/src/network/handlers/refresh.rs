use axum::extract::State;
use axum::Json;
use serde_json::json;

use super::AppState;
use crate::network::ApiError;

/// `POST /countries/refresh`. Runs a full refresh cycle inside the request.
pub async fn refresh_handler(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.refresh.refresh().await?;
    Ok(Json(json!({ "message": "Countries refreshed successfully" })))
}
