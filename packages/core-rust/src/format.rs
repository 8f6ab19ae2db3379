//! Human-readable GDP figures for the summary image.

const TRILLION: f64 = 1e12;
const BILLION: f64 = 1e9;

/// Formats `gdp` as `$X.XX trillion` at or above 1e12, else `$X.XX billion`.
#[must_use]
pub fn format_gdp(gdp: f64) -> String {
    if gdp >= TRILLION {
        format!("${:.2} trillion", gdp / TRILLION)
    } else {
        format!("${:.2} billion", gdp / BILLION)
    }
}

/// Like [`format_gdp`], with `N/A` for records without an estimate.
#[must_use]
pub fn format_optional_gdp(gdp: Option<f64>) -> String {
    gdp.map_or_else(|| "N/A".to_string(), format_gdp)
}
