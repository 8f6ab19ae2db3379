//! Access to the two upstream services a refresh depends on.
//!
//! [`UpstreamGateway`] is the seam between the refresh service and the
//! network: production uses [`HttpGateway`], tests script their own.

mod client;

use std::fmt;

use async_trait::async_trait;
use country_cache_core::RateTable;

pub use client::HttpGateway;

/// Identifies which upstream a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamApi {
    Countries,
    ExchangeRates,
}

impl UpstreamApi {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Countries => "Countries API",
            Self::ExchangeRates => "Exchange Rates API",
        }
    }

    /// Metric label value.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Countries => "countries",
            Self::ExchangeRates => "exchange_rates",
        }
    }
}

impl fmt::Display for UpstreamApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed upstream call. No retries are attempted.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("{api} request failed: {reason}")]
    Transport { api: UpstreamApi, reason: String },
    #[error("{api} responded with status {status}")]
    Status { api: UpstreamApi, status: u16 },
    #[error("{api} returned an unreadable body: {reason}")]
    Decode { api: UpstreamApi, reason: String },
}

impl UpstreamError {
    /// Which upstream failed.
    #[must_use]
    pub fn api(&self) -> UpstreamApi {
        match self {
            Self::Transport { api, .. } | Self::Status { api, .. } | Self::Decode { api, .. } => {
                *api
            }
        }
    }
}

/// Fetches raw upstream data.
#[async_trait]
pub trait UpstreamGateway: Send + Sync {
    /// Fetches the country list. Entries are returned undecoded; turning them
    /// into records is part of reconciliation.
    async fn fetch_countries(&self) -> Result<Vec<serde_json::Value>, UpstreamError>;

    /// Fetches the USD-based rate table.
    async fn fetch_rates(&self) -> Result<RateTable, UpstreamError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_names_match_error_details() {
        assert_eq!(UpstreamApi::Countries.to_string(), "Countries API");
        assert_eq!(UpstreamApi::ExchangeRates.to_string(), "Exchange Rates API");
    }

    #[test]
    fn api_is_recovered_from_every_variant() {
        let errors = [
            UpstreamError::Transport {
                api: UpstreamApi::Countries,
                reason: "timed out".to_string(),
            },
            UpstreamError::Status {
                api: UpstreamApi::Countries,
                status: 502,
            },
            UpstreamError::Decode {
                api: UpstreamApi::Countries,
                reason: "eof".to_string(),
            },
        ];
        for err in &errors {
            assert_eq!(err.api(), UpstreamApi::Countries);
        }
        assert_eq!(errors[1].to_string(), "Countries API responded with status 502");
    }
}
