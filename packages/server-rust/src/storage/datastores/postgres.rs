//! `PostgreSQL`-backed [`CountryStore`].
//!
//! The schema is created at startup by [`CountryStore::initialize`].
//!
//! Name lookups compare the `name_key` column, which holds the merge key
//! computed in Rust at insert time, so matching does not depend on the
//! database collation's idea of lowercase. The key has no unique constraint;
//! uniqueness comes from lookup-before-insert inside the refresh transaction,
//! so two refreshes racing on an empty table can both insert the same country.

use std::time::Duration;

use async_trait::async_trait;
use country_cache_core::{Country, CountryFields, CountryQuery, GdpSort};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::storage::{CountryStore, CountryTransaction, StoreError, StoreResult};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS countries (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(200) NOT NULL,
        name_key VARCHAR(200) NOT NULL,
        capital VARCHAR(200),
        region VARCHAR(200),
        population BIGINT NOT NULL,
        currency_code VARCHAR(200),
        exchange_rate DOUBLE PRECISION,
        estimated_gdp DOUBLE PRECISION,
        flag_url VARCHAR(200) NOT NULL,
        last_refreshed_at VARCHAR(200) NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS countries_name_key_idx ON countries (name_key)",
];

const COLUMNS: &str = "id, name, capital, region, population, currency_code, \
                       exchange_rate, estimated_gdp, flag_url, last_refreshed_at";

/// Row shape of the `countries` table.
#[derive(Debug, FromRow)]
struct CountryRow {
    id: i64,
    name: String,
    capital: Option<String>,
    region: Option<String>,
    population: i64,
    currency_code: Option<String>,
    exchange_rate: Option<f64>,
    estimated_gdp: Option<f64>,
    flag_url: String,
    last_refreshed_at: String,
}

impl From<CountryRow> for Country {
    fn from(row: CountryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            capital: row.capital,
            region: row.region,
            population: row.population,
            currency_code: row.currency_code,
            exchange_rate: row.exchange_rate,
            estimated_gdp: row.estimated_gdp,
            flag_url: row.flag_url,
            last_refreshed_at: row.last_refreshed_at,
        }
    }
}

/// Country store on a shared `sqlx` connection pool.
pub struct PgCountryStore {
    pool: PgPool,
}

impl PgCountryStore {
    /// Connects a pool sized and timed by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if no database URL is configured and
    /// [`StoreError::Database`] if the first connection cannot be established.
    pub async fn connect(config: &StorageConfig) -> StoreResult<Self> {
        let url = config.database_url.as_deref().ok_or_else(|| {
            StoreError::Unavailable("DATABASE_URL is required for postgres storage".to_string())
        })?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await?;
        info!(max_connections = config.max_connections, "connected to postgres");
        Ok(Self { pool })
    }
}

fn select_by_key() -> String {
    format!("SELECT {COLUMNS} FROM countries WHERE name_key = $1 ORDER BY id LIMIT 1")
}

/// Appends `WHERE`, `ORDER BY` and `LIMIT` clauses for `query`.
fn push_query_clauses(builder: &mut QueryBuilder<'_, Postgres>, query: &CountryQuery) {
    builder.push(" WHERE TRUE");
    if let Some(region) = &query.region {
        builder
            .push(" AND lower(region) = lower(")
            .push_bind(region.clone())
            .push(")");
    }
    if let Some(currency) = &query.currency {
        builder
            .push(" AND lower(currency_code) = lower(")
            .push_bind(currency.clone())
            .push(")");
    }
    builder.push(match query.sort {
        Some(GdpSort::Descending) => " ORDER BY estimated_gdp DESC NULLS LAST, id",
        Some(GdpSort::Ascending) => " ORDER BY estimated_gdp ASC NULLS FIRST, id",
        None => " ORDER BY id",
    });
    if let Some(limit) = query.limit {
        builder
            .push(" LIMIT ")
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    }
}

#[async_trait]
impl CountryStore for PgCountryStore {
    async fn initialize(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("countries schema ready");
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn begin(&self) -> StoreResult<Box<dyn CountryTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgCountryTransaction { tx }))
    }

    async fn find_by_key(&self, key: &str) -> StoreResult<Option<Country>> {
        let row = sqlx::query_as::<_, CountryRow>(&select_by_key())
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Country::from))
    }

    async fn list(&self, query: &CountryQuery) -> StoreResult<Vec<Country>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM countries"));
        push_query_clauses(&mut builder, query);
        let rows = builder
            .build_query_as::<CountryRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Country::from).collect())
    }

    async fn delete_by_key(&self, key: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            "DELETE FROM countries WHERE id = \
             (SELECT id FROM countries WHERE name_key = $1 ORDER BY id LIMIT 1)",
        )
        .bind(key)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM countries")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn latest_refresh(&self) -> StoreResult<Option<String>> {
        let latest: Option<String> = sqlx::query_scalar("SELECT max(last_refreshed_at) FROM countries")
            .fetch_one(&self.pool)
            .await?;
        Ok(latest)
    }
}

/// One refresh cycle inside a database transaction.
///
/// Dropping the wrapped `sqlx::Transaction` without committing rolls it back.
struct PgCountryTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CountryTransaction for PgCountryTransaction {
    async fn find_by_key(&mut self, key: &str) -> StoreResult<Option<Country>> {
        let row = sqlx::query_as::<_, CountryRow>(&select_by_key())
            .bind(key)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(Country::from))
    }

    async fn insert(&mut self, fields: &CountryFields) -> StoreResult<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO countries (name, name_key, capital, region, population, \
             currency_code, exchange_rate, estimated_gdp, flag_url, last_refreshed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
        )
        .bind(&fields.name)
        .bind(fields.merge_key())
        .bind(&fields.capital)
        .bind(&fields.region)
        .bind(fields.population)
        .bind(&fields.currency_code)
        .bind(fields.exchange_rate)
        .bind(fields.estimated_gdp)
        .bind(&fields.flag_url)
        .bind(&fields.last_refreshed_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(id)
    }

    async fn update(&mut self, id: i64, fields: &CountryFields) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE countries SET capital = $2, region = $3, population = $4, \
             currency_code = $5, exchange_rate = $6, estimated_gdp = $7, \
             flag_url = $8, last_refreshed_at = $9 WHERE id = $1",
        )
        .bind(id)
        .bind(&fields.capital)
        .bind(&fields.region)
        .bind(fields.population)
        .bind(&fields.currency_code)
        .bind(fields.exchange_rate)
        .bind(fields.estimated_gdp)
        .bind(&fields.flag_url)
        .bind(&fields.last_refreshed_at)
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() == 0 {
            debug!(id, "update skipped: country no longer exists");
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
