//! Refresh reconciliation: fetch both upstreams, merge into the store in one
//! transaction, then redraw the summary image.

use std::sync::Arc;

use chrono::Utc;
use country_cache_core::{derive_fields, GdpMultiplier, RateTable, UpstreamCountry};
use serde::Deserialize;
use tracing::{error, info, warn};

use super::summary::SummaryRenderer;
use crate::gateway::{UpstreamError, UpstreamGateway};
use crate::storage::{CountryStore, CountryTransaction, StoreError};

/// Format of `last_refreshed_at`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Outcome of a committed refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub inserted: usize,
    pub updated: usize,
    /// Whether the summary image was redrawn after commit.
    pub summary_rendered: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// Raised before any store access.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("upstream country entry #{index} is malformed: {source}")]
    MalformedEntry {
        index: usize,
        source: serde_json::Error,
    },
    #[error("store failure during refresh: {0}")]
    Store(#[from] StoreError),
}

/// Runs refresh cycles against injected store, gateway and multiplier.
pub struct RefreshService {
    store: Arc<dyn CountryStore>,
    gateway: Arc<dyn UpstreamGateway>,
    multiplier: Arc<dyn GdpMultiplier>,
    summary: Arc<SummaryRenderer>,
}

impl RefreshService {
    #[must_use]
    pub fn new(
        store: Arc<dyn CountryStore>,
        gateway: Arc<dyn UpstreamGateway>,
        multiplier: Arc<dyn GdpMultiplier>,
        summary: Arc<SummaryRenderer>,
    ) -> Self {
        Self {
            store,
            gateway,
            multiplier,
            summary,
        }
    }

    /// Runs one refresh cycle.
    ///
    /// Both upstreams are fetched sequentially before the store is touched;
    /// the rate table is not requested if the country fetch failed. All
    /// upserts commit together or not at all. The summary image is redrawn
    /// only after a successful commit, and a rendering failure does not fail
    /// the refresh.
    ///
    /// # Errors
    ///
    /// - [`RefreshError::Upstream`] if either fetch failed (store untouched)
    /// - [`RefreshError::MalformedEntry`] / [`RefreshError::Store`] if the
    ///   merge failed (transaction rolled back)
    pub async fn refresh(&self) -> Result<RefreshReport, RefreshError> {
        let refreshed_at = Utc::now().format(TIMESTAMP_FORMAT).to_string();
        info!(%refreshed_at, "refresh started");

        let countries = self
            .gateway
            .fetch_countries()
            .await
            .inspect_err(record_upstream_failure)?;
        let rates = self
            .gateway
            .fetch_rates()
            .await
            .inspect_err(record_upstream_failure)?;

        let mut report = match self.reconcile(&countries, &rates, &refreshed_at).await {
            Ok(report) => report,
            Err(err) => {
                metrics::counter!("country_cache_refresh_total", "outcome" => "failed").increment(1);
                return Err(err);
            }
        };
        metrics::counter!("country_cache_refresh_total", "outcome" => "committed").increment(1);
        info!(
            inserted = report.inserted,
            updated = report.updated,
            rates = rates.len(),
            "refresh committed"
        );

        match self.summary.render(self.store.as_ref()).await {
            Ok(stats) => {
                #[allow(clippy::cast_precision_loss)]
                metrics::gauge!("country_cache_countries").set(stats.total as f64);
                report.summary_rendered = true;
            }
            Err(err) => warn!(error = %err, "summary image not updated"),
        }
        Ok(report)
    }

    /// Applies every entry inside one transaction, rolling back on failure.
    async fn reconcile(
        &self,
        entries: &[serde_json::Value],
        rates: &RateTable,
        refreshed_at: &str,
    ) -> Result<RefreshReport, RefreshError> {
        let mut tx = self.store.begin().await?;
        let applied = apply_entries(
            tx.as_mut(),
            entries,
            rates,
            self.multiplier.as_ref(),
            refreshed_at,
        )
        .await;

        match applied {
            Ok(report) => {
                tx.commit().await?;
                Ok(report)
            }
            Err(err) => {
                error!(error = %err, "refresh failed, rolling back");
                if let Err(rollback_err) = tx.rollback().await {
                    error!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

fn record_upstream_failure(err: &UpstreamError) {
    warn!(api = %err.api(), error = %err, "upstream fetch failed");
    metrics::counter!("country_cache_upstream_failures_total", "api" => err.api().label())
        .increment(1);
    metrics::counter!("country_cache_refresh_total", "outcome" => "upstream_unavailable")
        .increment(1);
}

/// Upserts each upstream entry by merge key.
///
/// Lookups see earlier writes of the same cycle, so an upstream list that
/// repeats a country produces one record updated twice.
async fn apply_entries(
    tx: &mut dyn CountryTransaction,
    entries: &[serde_json::Value],
    rates: &RateTable,
    multiplier: &dyn GdpMultiplier,
    refreshed_at: &str,
) -> Result<RefreshReport, RefreshError> {
    let mut report = RefreshReport::default();

    for (index, raw) in entries.iter().enumerate() {
        let entry = UpstreamCountry::deserialize(raw)
            .map_err(|source| RefreshError::MalformedEntry { index, source })?;
        let fields = derive_fields(&entry, rates, multiplier, refreshed_at);

        match tx.find_by_key(&fields.merge_key()).await? {
            Some(existing) => {
                tx.update(existing.id, &fields).await?;
                report.updated += 1;
            }
            None => {
                tx.insert(&fields).await?;
                report.inserted += 1;
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use country_cache_core::{CountryQuery, FixedMultiplier};
    use serde_json::json;

    use super::*;
    use crate::gateway::UpstreamApi;
    use crate::storage::MemoryCountryStore;

    struct ScriptedGateway {
        countries: Result<serde_json::Value, u16>,
        rates: Result<serde_json::Value, u16>,
        rate_calls: AtomicUsize,
    }

    impl ScriptedGateway {
        fn ok(countries: serde_json::Value, rates: serde_json::Value) -> Self {
            Self {
                countries: Ok(countries),
                rates: Ok(rates),
                rate_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl UpstreamGateway for ScriptedGateway {
        async fn fetch_countries(&self) -> Result<Vec<serde_json::Value>, UpstreamError> {
            match &self.countries {
                Ok(body) => Ok(serde_json::from_value(body.clone()).unwrap()),
                Err(status) => Err(UpstreamError::Status {
                    api: UpstreamApi::Countries,
                    status: *status,
                }),
            }
        }

        async fn fetch_rates(&self) -> Result<RateTable, UpstreamError> {
            self.rate_calls.fetch_add(1, Ordering::SeqCst);
            match &self.rates {
                Ok(body) => Ok(RateTable::from(
                    serde_json::from_value::<country_cache_core::RatesResponse>(body.clone())
                        .unwrap(),
                )),
                Err(status) => Err(UpstreamError::Status {
                    api: UpstreamApi::ExchangeRates,
                    status: *status,
                }),
            }
        }
    }

    fn service(
        store: Arc<MemoryCountryStore>,
        gateway: ScriptedGateway,
        cache: &tempfile::TempDir,
    ) -> (RefreshService, Arc<ScriptedGateway>) {
        let gateway = Arc::new(gateway);
        let svc = RefreshService::new(
            store,
            Arc::clone(&gateway) as Arc<dyn UpstreamGateway>,
            Arc::new(FixedMultiplier(1000)),
            Arc::new(SummaryRenderer::new(cache.path().join("summary.png"))),
        );
        (svc, gateway)
    }

    fn countries() -> serde_json::Value {
        json!([
            {"name": "JAPAN", "population": 125_000_000, "currencies": [{"code": "jpy"}],
             "region": "Asia", "flag": "url"},
            {"name": "France", "capital": "Paris", "population": 68_000_000,
             "currencies": [{"code": "EUR"}], "region": "Europe", "flag": "fr"},
            {"name": "Atlantis", "population": 10, "region": "Ocean", "flag": "at"},
            {"name": "Narnia", "population": 5, "currencies": [{"code": "NAR"}],
             "region": "Fiction", "flag": "na"}
        ])
    }

    fn rates() -> serde_json::Value {
        json!({"rates": {"JPY": 110.0, "EUR": 0.5}})
    }

    async fn all(store: &MemoryCountryStore) -> Vec<country_cache_core::Country> {
        store.list(&CountryQuery::default()).await.unwrap()
    }

    #[tokio::test]
    async fn first_refresh_inserts_every_country() {
        let store = Arc::new(MemoryCountryStore::new());
        let cache = tempfile::tempdir().unwrap();
        let (svc, _) = service(Arc::clone(&store), ScriptedGateway::ok(countries(), rates()), &cache);

        let report = svc.refresh().await.unwrap();

        assert_eq!(report.inserted, 4);
        assert_eq!(report.updated, 0);
        assert!(report.summary_rendered);
        assert!(cache.path().join("summary.png").exists());

        let japan = store.find_by_key("japan").await.unwrap().unwrap();
        assert_eq!(japan.name, "JAPAN");
        assert_eq!(japan.currency_code.as_deref(), Some("jpy"));
        assert_eq!(japan.exchange_rate, Some(110.0));
        let expected = 125_000_000.0 * 1000.0 / 110.0;
        assert!((japan.estimated_gdp.unwrap() - expected).abs() < 1e-3);
    }

    #[tokio::test]
    async fn missing_currency_and_missing_rate_use_distinct_markers() {
        let store = Arc::new(MemoryCountryStore::new());
        let cache = tempfile::tempdir().unwrap();
        let (svc, _) = service(Arc::clone(&store), ScriptedGateway::ok(countries(), rates()), &cache);
        svc.refresh().await.unwrap();

        let atlantis = store.find_by_key("atlantis").await.unwrap().unwrap();
        assert_eq!(atlantis.currency_code, None);
        assert_eq!(atlantis.exchange_rate, None);
        assert_eq!(atlantis.estimated_gdp, Some(0.0));

        let narnia = store.find_by_key("narnia").await.unwrap().unwrap();
        assert_eq!(narnia.currency_code.as_deref(), Some("NAR"));
        assert_eq!(narnia.exchange_rate, None);
        assert_eq!(narnia.estimated_gdp, None);
    }

    #[tokio::test]
    async fn second_refresh_updates_in_place() {
        let store = Arc::new(MemoryCountryStore::new());
        let cache = tempfile::tempdir().unwrap();
        let (svc, _) = service(Arc::clone(&store), ScriptedGateway::ok(countries(), rates()), &cache);
        svc.refresh().await.unwrap();
        let before = all(&store).await;

        let report = svc.refresh().await.unwrap();
        let after = all(&store).await;

        assert_eq!(report.inserted, 0);
        assert_eq!(report.updated, 4);
        assert_eq!(
            before.iter().map(|c| c.id).collect::<Vec<_>>(),
            after.iter().map(|c| c.id).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn names_differing_in_case_and_composition_merge() {
        let store = Arc::new(MemoryCountryStore::new());
        let cache = tempfile::tempdir().unwrap();
        let body = json!([
            {"name": "Re\u{0301}union", "population": 1, "region": "Africa", "flag": "a"},
            {"name": "R\u{00C9}UNION", "population": 2, "region": "Africa", "flag": "b"}
        ]);
        let (svc, _) = service(Arc::clone(&store), ScriptedGateway::ok(body, rates()), &cache);

        let report = svc.refresh().await.unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(report.updated, 1);
        let rows = all(&store).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].population, 2);
        assert_eq!(rows[0].name, "Re\u{0301}union");
    }

    #[tokio::test]
    async fn country_fetch_failure_skips_rates_and_store() {
        let store = Arc::new(MemoryCountryStore::new());
        let cache = tempfile::tempdir().unwrap();
        let gateway = ScriptedGateway {
            countries: Err(503),
            rates: Ok(rates()),
            rate_calls: AtomicUsize::new(0),
        };
        let (svc, gateway) = service(Arc::clone(&store), gateway, &cache);

        let err = svc.refresh().await.unwrap_err();

        assert!(matches!(&err, RefreshError::Upstream(e) if e.api() == UpstreamApi::Countries));
        assert_eq!(gateway.rate_calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(!cache.path().join("summary.png").exists());
    }

    #[tokio::test]
    async fn rate_fetch_failure_leaves_store_unchanged() {
        let store = Arc::new(MemoryCountryStore::new());
        let cache = tempfile::tempdir().unwrap();
        let (seed, _) = service(Arc::clone(&store), ScriptedGateway::ok(countries(), rates()), &cache);
        seed.refresh().await.unwrap();
        let before = all(&store).await;

        let gateway = ScriptedGateway {
            countries: Ok(json!([{"name": "Japan", "population": 1, "flag": "x", "region": "Asia"}])),
            rates: Err(500),
            rate_calls: AtomicUsize::new(0),
        };
        let (svc, _) = service(Arc::clone(&store), gateway, &cache);
        let err = svc.refresh().await.unwrap_err();

        assert!(matches!(&err, RefreshError::Upstream(e) if e.api() == UpstreamApi::ExchangeRates));
        assert_eq!(all(&store).await, before);
    }

    #[tokio::test]
    async fn malformed_entry_rolls_back_whole_cycle() {
        let store = Arc::new(MemoryCountryStore::new());
        let cache = tempfile::tempdir().unwrap();
        let body = json!([
            {"name": "Japan", "population": 1, "flag": "x", "region": "Asia"},
            {"name": "No Population", "flag": "y", "region": "Asia"}
        ]);
        let (svc, _) = service(Arc::clone(&store), ScriptedGateway::ok(body, rates()), &cache);

        let err = svc.refresh().await.unwrap_err();

        assert!(matches!(err, RefreshError::MalformedEntry { index: 1, .. }), "{err}");
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn render_failure_keeps_committed_data() {
        let store = Arc::new(MemoryCountryStore::new());
        let cache = tempfile::tempdir().unwrap();
        // A regular file where the cache directory should be makes rendering fail.
        let blocker = cache.path().join("blocked");
        std::fs::write(&blocker, b"x").unwrap();
        let svc = RefreshService::new(
            Arc::clone(&store) as Arc<dyn CountryStore>,
            Arc::new(ScriptedGateway::ok(countries(), rates())),
            Arc::new(FixedMultiplier(1000)),
            Arc::new(SummaryRenderer::new(blocker.join("summary.png"))),
        );

        let report = svc.refresh().await.unwrap();

        assert!(!report.summary_rendered);
        assert_eq!(store.count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn records_share_the_cycle_timestamp() {
        let store = Arc::new(MemoryCountryStore::new());
        let cache = tempfile::tempdir().unwrap();
        let (svc, _) = service(Arc::clone(&store), ScriptedGateway::ok(countries(), rates()), &cache);
        svc.refresh().await.unwrap();

        let rows = all(&store).await;
        let stamp = &rows[0].last_refreshed_at;
        assert!(rows.iter().all(|c| &c.last_refreshed_at == stamp));
        assert!(chrono::NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).is_ok());
    }
}
