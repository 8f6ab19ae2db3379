//! Country name normalization.
//!
//! Names are stored in Unicode compatibility decomposition (NFKD) and compared
//! through a lowercased merge key, so "Côte d'Ivoire" typed with a precomposed
//! `ô` and one typed with `o` + combining circumflex land on the same record.

use unicode_normalization::UnicodeNormalization;

/// Returns the NFKD form of `name`. This is the spelling persisted on insert.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.nfkd().collect()
}

/// Returns the case-insensitive merge key for `name`: NFKD, then lowercase.
///
/// Applied both when reconciling upstream entries and when resolving
/// `/countries/<name>` lookups.
#[must_use]
pub fn merge_key(name: &str) -> String {
    normalize_name(name).to_lowercase()
}
