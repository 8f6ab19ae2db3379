//! In-memory [`CountryStore`] implementation backed by a `BTreeMap`.
//!
//! Rows are keyed by id, so iteration order is insertion order. Transactions
//! stage their writes privately and publish them under a single write lock
//! on commit.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use country_cache_core::{merge_key, Country, CountryFields, CountryQuery};
use parking_lot::RwLock;
use tracing::debug;

use crate::storage::{CountryStore, CountryTransaction, StoreResult};

type Table = BTreeMap<i64, Country>;

/// Process-local country table.
///
/// Suitable for development and tests. Contents are lost on restart.
pub struct MemoryCountryStore {
    rows: Arc<RwLock<Table>>,
    next_id: Arc<AtomicI64>,
}

impl MemoryCountryStore {
    /// Creates a new, empty store. Ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl Default for MemoryCountryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowest-id row in `rows` whose merge key equals `key`.
fn first_match<'a>(rows: impl Iterator<Item = &'a Country>, key: &str) -> Option<&'a Country> {
    rows.filter(|c| c.merge_key() == key).min_by_key(|c| c.id)
}

#[async_trait]
impl CountryStore for MemoryCountryStore {
    async fn initialize(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn begin(&self) -> StoreResult<Box<dyn CountryTransaction>> {
        Ok(Box::new(MemoryTransaction {
            rows: Arc::clone(&self.rows),
            next_id: Arc::clone(&self.next_id),
            inserted: BTreeMap::new(),
            updated: BTreeMap::new(),
        }))
    }

    async fn find_by_key(&self, key: &str) -> StoreResult<Option<Country>> {
        let rows = self.rows.read();
        Ok(first_match(rows.values(), key).cloned())
    }

    async fn list(&self, query: &CountryQuery) -> StoreResult<Vec<Country>> {
        let rows = self.rows.read();
        Ok(query.apply(rows.values().cloned()))
    }

    async fn delete_by_key(&self, key: &str) -> StoreResult<bool> {
        let mut rows = self.rows.write();
        let Some(id) = first_match(rows.values(), key).map(|c| c.id) else {
            return Ok(false);
        };
        rows.remove(&id);
        Ok(true)
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.rows.read().len() as u64)
    }

    async fn latest_refresh(&self) -> StoreResult<Option<String>> {
        let rows = self.rows.read();
        Ok(rows.values().map(|c| c.last_refreshed_at.clone()).max())
    }
}

/// Staged writes of one refresh cycle against a [`MemoryCountryStore`].
struct MemoryTransaction {
    rows: Arc<RwLock<Table>>,
    next_id: Arc<AtomicI64>,
    inserted: Table,
    /// Full post-update image of committed rows touched by this transaction.
    updated: Table,
}

#[async_trait]
impl CountryTransaction for MemoryTransaction {
    async fn find_by_key(&mut self, key: &str) -> StoreResult<Option<Country>> {
        let rows = self.rows.read();
        let committed = rows
            .values()
            .map(|c| self.updated.get(&c.id).unwrap_or(c));
        Ok(first_match(committed.chain(self.inserted.values()), key).cloned())
    }

    async fn insert(&mut self, fields: &CountryFields) -> StoreResult<i64> {
        // Like a database sequence, ids consumed by a rolled-back transaction are not reused.
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.inserted
            .insert(id, Country::from_fields(id, fields.clone()));
        Ok(id)
    }

    async fn update(&mut self, id: i64, fields: &CountryFields) -> StoreResult<()> {
        if let Some(row) = self.inserted.get_mut(&id) {
            row.apply_refresh(fields);
            return Ok(());
        }
        if let Some(row) = self.updated.get_mut(&id) {
            row.apply_refresh(fields);
            return Ok(());
        }
        let base = self.rows.read().get(&id).cloned();
        match base {
            Some(mut row) => {
                row.apply_refresh(fields);
                self.updated.insert(id, row);
            }
            None => debug!(id, "update skipped: country no longer exists"),
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let this = *self;
        let mut rows = this.rows.write();
        for (id, row) in this.updated {
            // Rows deleted since they were read stay deleted.
            if let Some(slot) = rows.get_mut(&id) {
                *slot = row;
            }
        }
        rows.extend(this.inserted);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}
