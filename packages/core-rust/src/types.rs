use serde::{Deserialize, Serialize};

/// Persisted country record as served by the query endpoints.
///
/// Field order matches the JSON object shape returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    /// Synthetic identifier assigned by the store on insert.
    pub id: i64,
    /// Normalized (NFKD) country name. Never rewritten after insert.
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: i64,
    /// Code of the first currency listed upstream, as spelled upstream.
    pub currency_code: Option<String>,
    /// USD-based rate for `currency_code`.
    pub exchange_rate: Option<f64>,
    /// `population * multiplier / exchange_rate`, or a marker when underivable.
    pub estimated_gdp: Option<f64>,
    pub flag_url: String,
    /// ISO-8601 UTC timestamp of the refresh cycle that last touched this record.
    pub last_refreshed_at: String,
}

impl Country {
    /// Builds a record from freshly derived fields and a store-assigned id.
    #[must_use]
    pub fn from_fields(id: i64, fields: CountryFields) -> Self {
        Self {
            id,
            name: fields.name,
            capital: fields.capital,
            region: fields.region,
            population: fields.population,
            currency_code: fields.currency_code,
            exchange_rate: fields.exchange_rate,
            estimated_gdp: fields.estimated_gdp,
            flag_url: fields.flag_url,
            last_refreshed_at: fields.last_refreshed_at,
        }
    }

    /// Overwrites every refreshable attribute in place.
    ///
    /// `id` and `name` are preserved: the stored spelling of the first insert wins.
    pub fn apply_refresh(&mut self, fields: &CountryFields) {
        self.capital.clone_from(&fields.capital);
        self.region.clone_from(&fields.region);
        self.population = fields.population;
        self.currency_code.clone_from(&fields.currency_code);
        self.exchange_rate = fields.exchange_rate;
        self.estimated_gdp = fields.estimated_gdp;
        self.flag_url.clone_from(&fields.flag_url);
        self.last_refreshed_at.clone_from(&fields.last_refreshed_at);
    }

    /// Case-insensitive merge key of the stored name.
    #[must_use]
    pub fn merge_key(&self) -> String {
        crate::normalize::merge_key(&self.name)
    }
}

/// Everything a refresh cycle writes for one country, minus the id.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryFields {
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: i64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
    pub flag_url: String,
    pub last_refreshed_at: String,
}

impl CountryFields {
    /// Merge key used to match these fields against stored records.
    #[must_use]
    pub fn merge_key(&self) -> String {
        crate::normalize::merge_key(&self.name)
    }
}
