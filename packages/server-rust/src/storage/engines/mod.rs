//! In-process [`CountryStore`](super::CountryStore) engines.

mod memory;

pub use memory::MemoryCountryStore;
