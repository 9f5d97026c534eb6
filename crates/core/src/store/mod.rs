//! Local movie mirror and the query-page cache in front of upstream search.
//!
//! Both stores are synchronous: every method takes the connection lock for the
//! duration of one call and never holds it across an await point.

mod sqlite;
mod types;

pub use sqlite::SqliteStore;
pub use types::*;

use crate::filter::{FilterQuery, SortSpec};

/// Durable storage for movies keyed by TMDB id.
pub trait MovieStore: Send + Sync {
    /// Insert the movie, or overwrite every non-key field of an existing row.
    fn upsert(&self, movie: &Movie) -> Result<(), StoreError>;

    /// Point lookup.
    fn get(&self, id: u32) -> Result<Option<Movie>, StoreError>;

    /// Bulk lookup.
    ///
    /// Without a sort the result follows the order of `ids`; with a sort the
    /// rows are ordered by the sort field. Missing ids are skipped.
    fn find_by_ids(&self, ids: &[u32], sort: Option<SortSpec>) -> Result<Vec<Movie>, StoreError>;

    /// Run a compiled filter. Returns the requested page and the total match count.
    fn find_filtered(&self, query: &FilterQuery) -> Result<(Vec<Movie>, u64), StoreError>;

    /// Up to `limit` id/title pairs whose title or original title contains `keyword`.
    fn suggestions(&self, keyword: &str, limit: u32) -> Result<Vec<MovieSuggestion>, StoreError>;

    /// Number of stored movies.
    fn count(&self) -> Result<u64, StoreError>;
}

/// Cache of upstream search pages keyed by (normalized query, page).
///
/// Rows are written at most once and never updated.
pub trait QueryPageCache: Send + Sync {
    fn lookup_page(&self, normalized_query: &str, page: u32)
        -> Result<Option<QueryPage>, StoreError>;

    /// Write the page unless a row for the same key exists.
    ///
    /// Concurrent writers are arbitrated by the storage uniqueness constraint;
    /// the loser gets [`PageInsert::AlreadyExists`] with the winner's row.
    fn insert_page_if_absent(&self, page: NewQueryPage) -> Result<PageInsert, StoreError>;

    /// Number of cached pages.
    fn page_count(&self) -> Result<u64, StoreError>;
}
