//! HTTP handlers and the state they share.

pub mod countries;
pub mod health;
pub mod image;
pub mod refresh;
pub mod status;

pub use countries::{delete_country_handler, get_country_handler, list_countries_handler};
pub use health::{health_handler, liveness_handler, readiness_handler};
pub use image::summary_image_handler;
pub use refresh::refresh_handler;
pub use status::{status_handler, welcome_handler};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use super::ShutdownController;
use crate::service::RefreshService;
use crate::storage::CountryStore;

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc` references so cloning per request is cheap.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CountryStore>,
    pub refresh: Arc<RefreshService>,
    /// Where the refresh service writes the summary PNG.
    pub image_path: Arc<PathBuf>,
    /// Health state for the probes.
    pub shutdown: Arc<ShutdownController>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}
