//! Application services behind the HTTP handlers.
//!
//! 1. **Refresh** (`refresh`): fetch upstreams, reconcile into the store in one
//!    transaction, then redraw the summary
//! 2. **Summary** (`summary`): aggregate stats and the summary image
//! 3. **Render** (`render`): bitmap-font PNG layout and atomic file write

pub mod refresh;
pub mod render;
pub mod summary;

pub use refresh::{RefreshError, RefreshReport, RefreshService, TIMESTAMP_FORMAT};
pub use summary::{SummaryError, SummaryRenderer, SummaryStats};
