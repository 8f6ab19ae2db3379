//! `reqwest`-based [`UpstreamGateway`].

use async_trait::async_trait;
use country_cache_core::{RateTable, RatesResponse};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{UpstreamApi, UpstreamError, UpstreamGateway};
use crate::config::UpstreamConfig;

/// HTTP client for the country-directory and exchange-rate services.
///
/// The configured timeout covers connect, request and body read of each
/// call independently.
pub struct HttpGateway {
    client: reqwest::Client,
    config: UpstreamConfig,
}

impl HttpGateway {
    /// Builds a client with the configured per-call timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(config: UpstreamConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("country-cache/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        api: UpstreamApi,
        url: &str,
    ) -> Result<T, UpstreamError> {
        let transport = |err: reqwest::Error| UpstreamError::Transport {
            api,
            reason: err.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                api,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(transport)?;
        debug!(%api, bytes = body.len(), "upstream response received");
        serde_json::from_slice(&body).map_err(|err| UpstreamError::Decode {
            api,
            reason: err.to_string(),
        })
    }
}

#[async_trait]
impl UpstreamGateway for HttpGateway {
    async fn fetch_countries(&self) -> Result<Vec<serde_json::Value>, UpstreamError> {
        self.get_json(UpstreamApi::Countries, &self.config.countries_url)
            .await
    }

    async fn fetch_rates(&self) -> Result<RateTable, UpstreamError> {
        let response: RatesResponse = self
            .get_json(UpstreamApi::ExchangeRates, &self.config.rates_url)
            .await?;
        Ok(RateTable::from(response))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use tokio::net::TcpListener;

    use super::*;

    /// Serves fixture endpoints on an OS-assigned port and returns the base URL.
    async fn fixture_server() -> String {
        let router = Router::new()
            .route(
                "/countries",
                get(|| async {
                    Json(json!([
                        {"name": "Japan", "population": 125_000_000, "flag": "jp", "region": "Asia",
                         "currencies": [{"code": "JPY"}]},
                        {"name": "Bouvet Island", "population": 0, "flag": "bv", "region": "Antarctic"}
                    ]))
                }),
            )
            .route(
                "/rates",
                get(|| async { Json(json!({"result": "success", "rates": {"jpy": 110.0, "USD": 1.0}})) }),
            )
            .route("/broken", get(|| async { StatusCode::BAD_GATEWAY }))
            .route("/not-json", get(|| async { "<html>maintenance</html>" }))
            .route("/no-rates", get(|| async { Json(json!({"result": "error"})) }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Json(json!([]))
                }),
            );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn gateway(base: &str, countries: &str, rates: &str) -> HttpGateway {
        HttpGateway::new(UpstreamConfig {
            countries_url: format!("{base}{countries}"),
            rates_url: format!("{base}{rates}"),
            timeout: Duration::from_millis(500),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn fetches_country_list_and_rates() {
        let base = fixture_server().await;
        let gw = gateway(&base, "/countries", "/rates");

        let countries = gw.fetch_countries().await.unwrap();
        assert_eq!(countries.len(), 2);
        assert_eq!(countries[0]["name"], "Japan");

        let rates = gw.fetch_rates().await.unwrap();
        assert_eq!(rates.rate_for("JPY"), Some(110.0));
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let base = fixture_server().await;
        let gw = gateway(&base, "/broken", "/broken");

        let err = gw.fetch_countries().await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status { status: 502, .. }), "{err}");
        assert_eq!(err.api(), UpstreamApi::Countries);

        let err = gw.fetch_rates().await.unwrap_err();
        assert_eq!(err.api(), UpstreamApi::ExchangeRates);
    }

    #[tokio::test]
    async fn unreadable_bodies_are_decode_errors() {
        let base = fixture_server().await;
        let gw = gateway(&base, "/not-json", "/no-rates");

        assert!(matches!(
            gw.fetch_countries().await,
            Err(UpstreamError::Decode { api: UpstreamApi::Countries, .. })
        ));
        assert!(matches!(
            gw.fetch_rates().await,
            Err(UpstreamError::Decode { api: UpstreamApi::ExchangeRates, .. })
        ));
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let base = fixture_server().await;
        let gw = gateway(&base, "/slow", "/rates");

        let err = gw.fetch_countries().await.unwrap_err();
        assert!(matches!(err, UpstreamError::Transport { .. }), "{err}");
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let gw = gateway(&format!("http://{addr}"), "/countries", "/rates");

        let err = gw.fetch_rates().await.unwrap_err();
        assert!(matches!(
            err,
            UpstreamError::Transport { api: UpstreamApi::ExchangeRates, .. }
        ));
    }
}
