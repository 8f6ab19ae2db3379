//! Database-backed [`CountryStore`](super::CountryStore) implementations.

mod postgres;

pub use postgres::PgCountryStore;
