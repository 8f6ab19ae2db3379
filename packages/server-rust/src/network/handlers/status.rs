use axum::extract::State;
use axum::Json;
use serde_json::json;

use super::AppState;
use crate::network::ApiError;

pub async fn welcome_handler() -> &'static str {
    "Welcome to the Country Currency & Exchange API"
}

/// `GET /status`: record count and the most recent refresh timestamp
/// (`null` when the store is empty).
pub async fn status_handler(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let total = state.store.count().await?;
    let last_refreshed_at = state.store.latest_refresh().await?;
    Ok(Json(json!({
        "total_countries": total,
        "last_refreshed_at": last_refreshed_at,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::handlers::test_support::offline_state;

    #[tokio::test]
    async fn empty_store_reports_null_timestamp() {
        let state = offline_state(std::path::Path::new("unused.png"));

        let json = status_handler(State(state)).await.unwrap().0;

        assert_eq!(json["total_countries"], 0);
        assert!(json["last_refreshed_at"].is_null());
    }
}
