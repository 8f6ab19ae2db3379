//! Country storage for the server.
//!
//! Defines the [`CountryStore`] trait used by every handler and the
//! [`CountryTransaction`] unit of work used by the refresh reconciler:
//!
//! - **Engines** ([`MemoryCountryStore`]): in-process table for development
//!   and tests
//! - **Datastores** (`PgCountryStore`): `PostgreSQL` persistence via `sqlx`
//!
//! Names passed to lookups are merge keys (see
//! [`country_cache_core::merge_key`]), never raw user input.

pub mod engines;
pub mod factory;

#[cfg(feature = "postgres")]
pub mod datastores;

use async_trait::async_trait;
use country_cache_core::{Country, CountryFields, CountryQuery};

pub use engines::MemoryCountryStore;
pub use factory::open_store;

/// Errors raised by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("storage backend not available: {0}")]
    Unavailable(String),
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent table of country records.
///
/// Used as `Arc<dyn CountryStore>` in handler state.
#[async_trait]
pub trait CountryStore: Send + Sync {
    /// One-time initialization (create tables and indexes).
    async fn initialize(&self) -> StoreResult<()>;

    /// Cheap round trip used by the readiness probe.
    async fn ping(&self) -> StoreResult<()>;

    /// Opens a unit of work. Nothing it writes is visible to other callers
    /// until [`CountryTransaction::commit`] succeeds.
    async fn begin(&self) -> StoreResult<Box<dyn CountryTransaction>>;

    /// Finds the record whose lowercased name equals `key`.
    ///
    /// If duplicates exist, the lowest id is returned.
    async fn find_by_key(&self, key: &str) -> StoreResult<Option<Country>>;

    /// Lists records matching `query`, in the order it requests.
    async fn list(&self, query: &CountryQuery) -> StoreResult<Vec<Country>>;

    /// Deletes the record matched by `key`. Returns `false` if none matched.
    async fn delete_by_key(&self, key: &str) -> StoreResult<bool>;

    /// Number of stored records.
    async fn count(&self) -> StoreResult<u64>;

    /// Latest `last_refreshed_at` across all records.
    async fn latest_refresh(&self) -> StoreResult<Option<String>>;
}

/// Unit of work for one refresh cycle.
///
/// Reads observe the transaction's own uncommitted writes. Dropping a
/// transaction without committing discards everything it staged.
#[async_trait]
pub trait CountryTransaction: Send {
    /// Like [`CountryStore::find_by_key`], including staged writes.
    async fn find_by_key(&mut self, key: &str) -> StoreResult<Option<Country>>;

    /// Inserts a new record and returns its id.
    async fn insert(&mut self, fields: &CountryFields) -> StoreResult<i64>;

    /// Overwrites the refreshable attributes of record `id`.
    async fn update(&mut self, id: i64, fields: &CountryFields) -> StoreResult<()>;

    /// Makes every staged write visible atomically.
    async fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Discards every staged write.
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
