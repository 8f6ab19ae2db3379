//! Mapping of handler failures to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use country_cache_core::QueryError;
use serde_json::json;
use tracing::error;

use crate::gateway::UpstreamApi;
use crate::service::RefreshError;
use crate::storage::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("could not fetch data from {0}")]
    UpstreamUnavailable(UpstreamApi),
    /// Details are logged, never sent to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub const COUNTRY_NOT_FOUND: Self = Self::NotFound("Country not found");
    pub const IMAGE_NOT_FOUND: Self = Self::NotFound("Summary image not found");

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::NotFound(message) => json!({ "error": message }),
            Self::Validation(message) => json!({ "error": message }),
            Self::UpstreamUnavailable(api) => json!({
                "error": "External data source unavailable",
                "details": format!("Could not fetch data from {api}"),
            }),
            Self::Internal(detail) => {
                error!(%detail, "request failed");
                json!({ "error": "Internal server error" })
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<RefreshError> for ApiError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::Upstream(upstream) => Self::UpstreamUnavailable(upstream.api()),
            other => Self::Internal(other.to_string()),
        }
    }
}
