//! Summary statistics and the rendered summary image.

use std::path::{Path, PathBuf};

use chrono::Utc;
use country_cache_core::{format_optional_gdp, Country, CountryQuery};
use tracing::info;

use super::refresh::TIMESTAMP_FORMAT;
use super::render::{render_lines, write_png, TextLine};
use crate::storage::{CountryStore, StoreError};

/// Number of countries listed on the summary image.
pub const TOP_N: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to encode summary image: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to write summary image: {0}")]
    Io(#[from] std::io::Error),
    #[error("summary rendering task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Aggregates shown on the summary image.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStats {
    pub total: u64,
    /// Highest estimated GDP first, absent GDP last, ties by id.
    pub top: Vec<Country>,
    /// `last_refreshed_at` of the first listed record, or now if none.
    pub timestamp: String,
}

impl SummaryStats {
    /// Text content of the image, top to bottom.
    #[must_use]
    pub fn lines(&self) -> Vec<TextLine> {
        let mut lines = vec![
            TextLine::title("Countries Summary Chart"),
            TextLine::body(format!("Total number of countries: {}", self.total)),
            TextLine::heading("Top 5 countries by estimated GDP:"),
        ];
        lines.extend(self.top.iter().enumerate().map(|(i, country)| {
            TextLine::small(format!(
                "{}. {}: {}",
                i + 1,
                country.name,
                format_optional_gdp(country.estimated_gdp)
            ))
        }));
        lines.push(TextLine::footer(format!("Last refresh: {}", self.timestamp)));
        lines
    }
}

/// Draws the summary PNG into a fixed cache location.
pub struct SummaryRenderer {
    image_path: PathBuf,
}

impl SummaryRenderer {
    #[must_use]
    pub fn new(image_path: PathBuf) -> Self {
        Self { image_path }
    }

    #[must_use]
    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    /// Reads total count and top records from `store`.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn collect(&self, store: &dyn CountryStore) -> Result<SummaryStats, StoreError> {
        let total = store.count().await?;
        let top = store.list(&CountryQuery::top_by_gdp(TOP_N)).await?;
        let timestamp = top.first().map_or_else(
            || Utc::now().format(TIMESTAMP_FORMAT).to_string(),
            |c| c.last_refreshed_at.clone(),
        );
        Ok(SummaryStats {
            total,
            top,
            timestamp,
        })
    }

    /// Collects stats and overwrites the image with a fresh rendering.
    ///
    /// The PNG is written to a sibling temp file and renamed into place.
    ///
    /// # Errors
    ///
    /// Returns [`SummaryError`] if reading the store, encoding or writing fails.
    pub async fn render(&self, store: &dyn CountryStore) -> Result<SummaryStats, SummaryError> {
        let stats = self.collect(store).await?;
        let lines = stats.lines();
        let path = self.image_path.clone();

        let written = tokio::task::spawn_blocking(move || {
            let image = render_lines(&lines);
            write_png(&image, &path)?;
            Ok::<_, SummaryError>(path)
        })
        .await??;

        info!(path = %written.display(), total = stats.total, "summary image saved");
        Ok(stats)
    }
}
