//! Payload types of the two upstream services.

use std::collections::HashMap;

use serde::Deserialize;

/// One entry of the country-directory response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpstreamCountry {
    pub name: String,
    #[serde(default)]
    pub capital: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    pub population: i64,
    pub flag: String,
    /// Absent, `null` and `[]` are all possible upstream.
    #[serde(default)]
    pub currencies: Option<Vec<UpstreamCurrency>>,
}

impl UpstreamCountry {
    /// Code of the first listed currency, if the entry carries one.
    #[must_use]
    pub fn first_currency_code(&self) -> Option<&str> {
        self.currencies
            .as_ref()?
            .first()?
            .code
            .as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpstreamCurrency {
    #[serde(default)]
    pub code: Option<String>,
}

/// Body of the exchange-rate response. Other top-level fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RatesResponse {
    pub rates: HashMap<String, f64>,
}

/// USD-based exchange rates keyed by uppercased currency code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    rates: HashMap<String, f64>,
}

impl RateTable {
    /// Builds a table, uppercasing every code so lookups ignore case.
    #[must_use]
    pub fn new(rates: impl IntoIterator<Item = (String, f64)>) -> Self {
        Self {
            rates: rates
                .into_iter()
                .map(|(code, rate)| (code.to_uppercase(), rate))
                .collect(),
        }
    }

    /// Looks up the rate for `code`, ignoring case.
    ///
    /// A zero rate is reported as absent: it cannot be divided by.
    #[must_use]
    pub fn rate_for(&self, code: &str) -> Option<f64> {
        self.rates
            .get(&code.to_uppercase())
            .copied()
            .filter(|rate| *rate != 0.0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl From<RatesResponse> for RateTable {
    fn from(response: RatesResponse) -> Self {
        Self::new(response.rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> UpstreamCountry {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parses_full_entry() {
        let c = parse(json!({
            "name": "Japan",
            "capital": "Tokyo",
            "region": "Asia",
            "population": 125_000_000,
            "flag": "https://flagcdn.com/jp.svg",
            "currencies": [{"code": "JPY", "name": "Japanese yen", "symbol": "¥"}],
            "independent": true
        }));
        assert_eq!(c.capital.as_deref(), Some("Tokyo"));
        assert_eq!(c.first_currency_code(), Some("JPY"));
    }

    #[test]
    fn capital_and_currencies_are_optional() {
        let c = parse(json!({
            "name": "Antarctica",
            "region": "Polar",
            "population": 1000,
            "flag": "f"
        }));
        assert!(c.capital.is_none());
        assert!(c.first_currency_code().is_none());
    }

    #[test]
    fn empty_or_codeless_currency_list_yields_no_code() {
        let empty = parse(json!({"name": "A", "population": 1, "flag": "f", "currencies": []}));
        let codeless = parse(json!({"name": "B", "population": 1, "flag": "f", "currencies": [{"name": "x"}]}));
        let null = parse(json!({"name": "C", "population": 1, "flag": "f", "currencies": null}));
        assert!(empty.first_currency_code().is_none());
        assert!(codeless.first_currency_code().is_none());
        assert!(null.first_currency_code().is_none());
    }

    #[test]
    fn missing_population_is_rejected() {
        let result: Result<UpstreamCountry, _> =
            serde_json::from_value(json!({"name": "A", "flag": "f"}));
        assert!(result.is_err());
    }

    #[test]
    fn rate_lookup_ignores_case() {
        let table = RateTable::new([("JPY".to_string(), 110.0), ("eur".to_string(), 0.9)]);
        assert_eq!(table.rate_for("jpy"), Some(110.0));
        assert_eq!(table.rate_for("EUR"), Some(0.9));
        assert_eq!(table.rate_for("GBP"), None);
    }

    #[test]
    fn zero_rate_is_absent() {
        let table = RateTable::new([("XXX".to_string(), 0.0)]);
        assert_eq!(table.rate_for("XXX"), None);
    }

    #[test]
    fn rates_response_ignores_envelope_fields() {
        let response: RatesResponse = serde_json::from_value(json!({
            "result": "success",
            "base_code": "USD",
            "rates": {"USD": 1, "NGN": 1600.5}
        }))
        .unwrap();
        let table = RateTable::from(response);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rate_for("ngn"), Some(1600.5));
    }
}
