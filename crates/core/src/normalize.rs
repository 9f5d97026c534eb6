//! Cache-key normalization for free-text search queries.

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Map a raw search query to the key used by the query-page cache.
///
/// Folds case, strips diacritics and collapses whitespace, so that
/// `"  Amélie "` and `"amelie"` share a cache entry. Total and idempotent.
pub fn normalize_query(raw: &str) -> String {
    let lowered: String = raw.chars().flat_map(char::to_lowercase).collect();
    let folded: String = lowered.nfd().filter(|c| !is_combining_mark(*c)).collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}
