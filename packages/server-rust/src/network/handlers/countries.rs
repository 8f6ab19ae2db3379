//! Listing, lookup and deletion of cached countries.

use axum::extract::{Path, Query, State};
use axum::Json;
use country_cache_core::{merge_key, Country, CountryQuery};
use serde_json::json;
use tracing::info;

use super::AppState;
use crate::network::ApiError;

/// `GET /countries` with optional `region`, `currency` and `sort`.
///
/// An empty result is a 404 whenever the request carried any parameter;
/// an unparameterised listing may return `[]`.
pub async fn list_countries_handler(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Country>>, ApiError> {
    let query = CountryQuery::from_params(params)?;
    let countries = state.store.list(&query).await?;
    if countries.is_empty() && query.parameters_supplied {
        return Err(ApiError::COUNTRY_NOT_FOUND);
    }
    Ok(Json(countries))
}

/// `GET /countries/{name}`, matched case-insensitively.
pub async fn get_country_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Country>, ApiError> {
    state
        .store
        .find_by_key(&merge_key(&name))
        .await?
        .map(Json)
        .ok_or(ApiError::COUNTRY_NOT_FOUND)
}

/// `DELETE /countries/{name}`, matched case-insensitively.
pub async fn delete_country_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.store.delete_by_key(&merge_key(&name)).await? {
        return Err(ApiError::COUNTRY_NOT_FOUND);
    }
    info!(%name, "country deleted");
    Ok(Json(json!({ "message": "Country deleted Successfully" })))
}
