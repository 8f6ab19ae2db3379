//! Construction of the configured [`CountryStore`].
//!
//! [`open_store`] is the dependency injection point between configuration
//! and handler state: it picks the backend, connects it and creates the
//! schema before any request is served.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{StorageBackend, StorageConfig};
use crate::storage::{CountryStore, MemoryCountryStore, StoreResult};

/// Opens and initializes the backend selected by `config`.
///
/// # Errors
///
/// Returns [`StoreError::Unavailable`] when the backend is not compiled in or
/// lacks required settings, and [`StoreError::Database`] when connecting or
/// creating the schema fails.
pub async fn open_store(config: &StorageConfig) -> StoreResult<Arc<dyn CountryStore>> {
    let store: Arc<dyn CountryStore> = match config.backend {
        StorageBackend::Memory => {
            warn!("using in-memory storage; data is lost on restart");
            Arc::new(MemoryCountryStore::new())
        }
        StorageBackend::Postgres => connect_postgres(config).await?,
    };
    store.initialize().await?;
    info!(backend = ?config.backend, "country store ready");
    Ok(store)
}

#[cfg(feature = "postgres")]
async fn connect_postgres(config: &StorageConfig) -> StoreResult<Arc<dyn CountryStore>> {
    let store = crate::storage::datastores::PgCountryStore::connect(config).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "postgres"))]
#[allow(clippy::unused_async)]
async fn connect_postgres(_config: &StorageConfig) -> StoreResult<Arc<dyn CountryStore>> {
    Err(crate::storage::StoreError::Unavailable(
        "built without the `postgres` feature".to_string(),
    ))
}
