//! Result envelopes and errors returned by the catalog service.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{Movie, StoreError};
use crate::upstream::UpstreamError;

/// Errors surfaced by [`super::CatalogService`].
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Nothing upstream or locally for the request.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream call failed; nothing was committed.
    #[error("Upstream error: {message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<StoreError> for CatalogError {
    fn from(e: StoreError) -> Self {
        CatalogError::Storage(e.to_string())
    }
}

impl From<UpstreamError> for CatalogError {
    fn from(e: UpstreamError) -> Self {
        CatalogError::Upstream {
            status: e.status(),
            message: e.to_string(),
        }
    }
}

/// A page of keyword search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub movies: Vec<Movie>,
    pub total_pages: u32,
    pub total_results: u32,
    /// Served from the query-page cache without contacting upstream.
    pub from_cache: bool,
    /// Ids fetched from upstream that could not be stored; the page was not cached.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unsaved_ids: Vec<u32>,
}

/// A page of a local listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieListing {
    pub movies: Vec<Movie>,
    pub total_pages: u64,
    /// Rows matching the filter across all pages.
    pub total_movies: u64,
}

impl MovieListing {
    pub fn new(movies: Vec<Movie>, total_movies: u64, limit: u32) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total_movies.div_ceil(u64::from(limit))
        };
        Self {
            movies,
            total_pages,
            total_movies,
        }
    }
}

/// A movie that could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedUpsert {
    pub id: u32,
    pub error: String,
}

/// Outcome of a bulk upsert. Individual failures never abort the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertReport {
    pub upserted: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<FailedUpsert>,
}

impl UpsertReport {
    pub fn failed_ids(&self) -> Vec<u32> {
        self.failed.iter().map(|f| f.id).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub movies: u64,
    pub cached_pages: u64,
}
