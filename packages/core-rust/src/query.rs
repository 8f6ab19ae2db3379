//! Query parameters accepted by the country listing endpoint.
//!
//! Validation happens here so the HTTP layer only maps [`QueryError`] to a
//! status code. Filtering and ordering helpers are shared by in-process
//! stores; SQL stores express the same rules in their `WHERE`/`ORDER BY`.

use std::cmp::Ordering;

use crate::types::Country;

/// Parameter names recognized by `GET /countries`.
pub const ALLOWED_PARAMS: [&str; 3] = ["region", "currency", "sort"];

/// Ordering requested through the `sort` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GdpSort {
    /// `sort=gdp_desc`: highest estimated GDP first, absent GDP last.
    Descending,
    /// `sort=gdp_asc`: lowest estimated GDP first, absent GDP first.
    Ascending,
}

impl GdpSort {
    /// Parses a `sort` value. Unrecognized values mean default ordering.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "gdp_desc" => Some(Self::Descending),
            "gdp_asc" => Some(Self::Ascending),
            _ => None,
        }
    }

    /// Compares two records under this ordering, ties broken by id.
    #[must_use]
    pub fn compare(self, a: &Country, b: &Country) -> Ordering {
        // Absent GDP is the minimum.
        let by_gdp = match (a.estimated_gdp, b.estimated_gdp) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        let by_gdp = match self {
            Self::Ascending => by_gdp,
            Self::Descending => by_gdp.reverse(),
        };
        by_gdp.then(a.id.cmp(&b.id))
    }
}

/// Rejected query string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("Validation failed: Invalid parameter '{0}'")]
    UnknownParameter(String),
}

/// Validated listing query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountryQuery {
    /// Case-insensitive exact match on region.
    pub region: Option<String>,
    /// Case-insensitive exact match on currency code.
    pub currency: Option<String>,
    pub sort: Option<GdpSort>,
    /// Maximum number of rows. Not reachable from HTTP; used by the summary.
    pub limit: Option<usize>,
    /// True when the request carried any parameter at all. An empty result
    /// is then reported as not-found instead of an empty list.
    pub parameters_supplied: bool,
}

impl CountryQuery {
    /// Builds a query from raw `(name, value)` pairs in request order.
    ///
    /// The first occurrence of a repeated parameter wins. Empty values are
    /// treated as absent filters but still count as supplied parameters.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownParameter`] naming the first parameter
    /// outside [`ALLOWED_PARAMS`].
    pub fn from_params<I, K, V>(params: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut query = Self::default();
        let mut region = None;
        let mut currency = None;
        let mut sort = None;

        for (name, value) in params {
            let (name, value) = (name.as_ref(), value.as_ref());
            query.parameters_supplied = true;
            let slot = match name {
                "region" => &mut region,
                "currency" => &mut currency,
                "sort" => &mut sort,
                other => return Err(QueryError::UnknownParameter(other.to_string())),
            };
            if slot.is_none() {
                *slot = Some(value.to_string());
            }
        }

        query.region = region.filter(|v| !v.is_empty());
        query.currency = currency.filter(|v| !v.is_empty());
        query.sort = sort.as_deref().and_then(GdpSort::parse);
        Ok(query)
    }

    /// Top-`n` by estimated GDP, as used by the summary renderer.
    #[must_use]
    pub fn top_by_gdp(n: usize) -> Self {
        Self {
            sort: Some(GdpSort::Descending),
            limit: Some(n),
            ..Self::default()
        }
    }

    /// Whether `country` passes the region and currency filters.
    #[must_use]
    pub fn matches(&self, country: &Country) -> bool {
        fn eq_ignore_case(filter: Option<&String>, value: Option<&String>) -> bool {
            match filter {
                None => true,
                Some(f) => value.is_some_and(|v| v.to_lowercase() == f.to_lowercase()),
            }
        }
        eq_ignore_case(self.region.as_ref(), country.region.as_ref())
            && eq_ignore_case(self.currency.as_ref(), country.currency_code.as_ref())
    }

    /// Filters, orders and truncates `rows` (assumed to be in id order).
    #[must_use]
    pub fn apply(&self, rows: impl IntoIterator<Item = Country>) -> Vec<Country> {
        let mut selected: Vec<Country> = rows.into_iter().filter(|c| self.matches(c)).collect();
        match self.sort {
            Some(sort) => selected.sort_by(|a, b| sort.compare(a, b)),
            None => selected.sort_by_key(|c| c.id),
        }
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}
