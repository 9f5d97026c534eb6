//! Types for the local movie mirror and its query-page cache.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::normalize::normalize_query;

/// Kind of catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Movie,
    Tv,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "movie" => Some(MediaType::Movie),
            "tv" => Some(MediaType::Tv),
            _ => None,
        }
    }
}

/// A movie mirrored from TMDB.
///
/// `id` is the TMDB identifier and never changes. Every other field is
/// overwritten on upsert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<u32>,
    #[serde(default)]
    pub popularity: Option<f64>,
    /// Genre ids; order carries no meaning.
    #[serde(default)]
    pub genre_ids: Vec<u32>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub adult: bool,
    #[serde(default)]
    pub media_type: MediaType,
    #[serde(default)]
    pub video: bool,
}

impl Movie {
    /// Minimal movie with only the required fields set.
    pub fn new(id: u32, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            overview: None,
            release_date: None,
            poster_path: None,
            backdrop_path: None,
            vote_average: None,
            vote_count: None,
            popularity: None,
            genre_ids: Vec::new(),
            original_language: None,
            original_title: None,
            adult: false,
            media_type: MediaType::Movie,
            video: false,
        }
    }
}

/// Id/title pair returned by keyword suggestions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MovieSuggestion {
    pub id: u32,
    pub title: String,
}

/// One cached page of upstream search results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryPage {
    /// Query text as the first caller typed it.
    pub query: String,
    pub normalized_query: String,
    pub page: u32,
    /// Movie ids in upstream order.
    pub movie_ids: Vec<u32>,
    pub total_pages: u32,
    pub total_results: u32,
    pub created_at: DateTime<Utc>,
}

/// Candidate row for the query-page cache.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQueryPage {
    pub query: String,
    pub normalized_query: String,
    pub page: u32,
    pub movie_ids: Vec<u32>,
    pub total_pages: u32,
    pub total_results: u32,
}

impl NewQueryPage {
    /// Build a candidate page, normalizing the query and cleaning the id list.
    pub fn new(
        query: &str,
        page: u32,
        movie_ids: &[u32],
        total_pages: u32,
        total_results: u32,
    ) -> Self {
        Self {
            query: query.to_string(),
            normalized_query: normalize_query(query),
            page,
            movie_ids: unique_movie_ids(movie_ids),
            total_pages,
            total_results,
        }
    }
}

/// Outcome of an insert-if-absent into the query-page cache.
#[derive(Debug, Clone, PartialEq)]
pub enum PageInsert {
    /// This call wrote the row.
    Inserted(QueryPage),
    /// Another writer got there first; this is their row.
    AlreadyExists(QueryPage),
    /// Nothing to cache (no usable ids).
    Rejected,
}

impl PageInsert {
    pub fn page(&self) -> Option<&QueryPage> {
        match self {
            PageInsert::Inserted(page) | PageInsert::AlreadyExists(page) => Some(page),
            PageInsert::Rejected => None,
        }
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            PageInsert::Inserted(_) => "inserted",
            PageInsert::AlreadyExists(_) => "already_exists",
            PageInsert::Rejected => "rejected",
        }
    }
}

/// Order-preserving dedup that drops the invalid id `0`.
pub fn unique_movie_ids(ids: &[u32]) -> Vec<u32> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter()
        .copied()
        .filter(|id| *id > 0 && seen.insert(*id))
        .collect()
}

/// Parse an upstream release date.
///
/// Blank or unparseable values become `None`. Accepts `YYYY-MM-DD` and full
/// RFC 3339 timestamps.
pub fn parse_release_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).date_naive())
        })
}

/// Errors for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}
