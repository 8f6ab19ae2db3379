//! Derivation of currency and estimated GDP for one upstream entry.
//!
//! This is the per-entry half of reconciliation: it turns an
//! [`UpstreamCountry`] plus the [`RateTable`] into the [`CountryFields`] the
//! store will write. Matching against stored records happens in the server.

use rand::Rng;
use tracing::debug;

use crate::normalize::normalize_name;
use crate::types::CountryFields;
use crate::upstream::{RateTable, UpstreamCountry};

/// Inclusive lower bound of the GDP multiplier.
pub const MULTIPLIER_MIN: u32 = 1000;
/// Inclusive upper bound of the GDP multiplier.
pub const MULTIPLIER_MAX: u32 = 2000;

/// Source of the per-record GDP multiplier.
///
/// Production draws a fresh value for every record on every refresh, so
/// `estimated_gdp` changes between refreshes even when upstream data does not.
/// Tests inject [`FixedMultiplier`].
pub trait GdpMultiplier: Send + Sync {
    /// Returns a value in `MULTIPLIER_MIN..=MULTIPLIER_MAX`.
    fn draw(&self) -> u32;
}

/// Uniform draw from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformMultiplier;

impl GdpMultiplier for UniformMultiplier {
    fn draw(&self) -> u32 {
        rand::rng().random_range(MULTIPLIER_MIN..=MULTIPLIER_MAX)
    }
}

/// Always returns the wrapped value.
#[derive(Debug, Clone, Copy)]
pub struct FixedMultiplier(pub u32);

impl GdpMultiplier for FixedMultiplier {
    fn draw(&self) -> u32 {
        self.0
    }
}

/// Currency-dependent part of a refreshed record.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyFields {
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
}

impl CurrencyFields {
    /// Entry has no usable currency code.
    ///
    /// GDP is recorded as `0.0` here but as `None` when only the rate is
    /// missing. The two markers are kept distinct on purpose; see DESIGN.md.
    #[must_use]
    pub fn without_currency() -> Self {
        Self {
            currency_code: None,
            exchange_rate: None,
            estimated_gdp: Some(0.0),
        }
    }
}

/// Derives currency code, rate and estimated GDP for `entry`.
///
/// The multiplier is drawn only when a GDP is actually computed.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn derive_currency(
    entry: &UpstreamCountry,
    rates: &RateTable,
    multiplier: &dyn GdpMultiplier,
) -> CurrencyFields {
    let Some(code) = entry.first_currency_code() else {
        debug!(country = %entry.name, "upstream entry has no currency code");
        return CurrencyFields::without_currency();
    };

    match rates.rate_for(code) {
        Some(rate) => CurrencyFields {
            currency_code: Some(code.to_string()),
            exchange_rate: Some(rate),
            estimated_gdp: Some(entry.population as f64 * f64::from(multiplier.draw()) / rate),
        },
        None => {
            debug!(country = %entry.name, code, "no exchange rate for currency");
            CurrencyFields {
                currency_code: Some(code.to_string()),
                exchange_rate: None,
                estimated_gdp: None,
            }
        }
    }
}

/// Builds the full set of fields written for `entry` in one refresh cycle.
#[must_use]
pub fn derive_fields(
    entry: &UpstreamCountry,
    rates: &RateTable,
    multiplier: &dyn GdpMultiplier,
    refreshed_at: &str,
) -> CountryFields {
    let currency = derive_currency(entry, rates, multiplier);
    CountryFields {
        name: normalize_name(&entry.name),
        capital: entry.capital.clone(),
        region: entry.region.clone(),
        population: entry.population,
        currency_code: currency.currency_code,
        exchange_rate: currency.exchange_rate,
        estimated_gdp: currency.estimated_gdp,
        flag_url: entry.flag.clone(),
        last_refreshed_at: refreshed_at.to_string(),
    }
}
