//! Country cache core: country records, name normalization, query validation,
//! and currency/GDP derivation.

pub mod derive;
pub mod format;
pub mod normalize;
pub mod query;
pub mod types;
pub mod upstream;

pub use derive::{
    derive_currency, derive_fields, CurrencyFields, FixedMultiplier, GdpMultiplier,
    UniformMultiplier,
};
pub use format::{format_gdp, format_optional_gdp};
pub use normalize::{merge_key, normalize_name};
pub use query::{CountryQuery, GdpSort, QueryError, ALLOWED_PARAMS};
pub use types::{Country, CountryFields};
pub use upstream::{RateTable, RatesResponse, UpstreamCountry, UpstreamCurrency};
