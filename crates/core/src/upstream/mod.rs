//! Upstream movie metadata source (TMDB).
//!
//! The catalog only ever talks to [`MovieSource`]; [`TmdbClient`] is the
//! production implementation and [`UnconfiguredSource`] stands in when no
//! credentials are configured.

mod tmdb;
mod types;

pub use tmdb::{TmdbClient, TmdbConfig};
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::store::Movie;

/// Errors that can occur when talking to the upstream source.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Rate limit exceeded (429), with the upstream message.
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Resource not found (404).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Missing or rejected credentials.
    #[error("Source not configured: {0}")]
    NotConfigured(String),
}

impl UpstreamError {
    /// HTTP status associated with the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Http(e) => e.status().map(|s| s.as_u16()),
            UpstreamError::RateLimited(_) => Some(429),
            UpstreamError::NotFound(_) => Some(404),
            UpstreamError::Api { status, .. } => Some(*status),
            UpstreamError::Parse(_) | UpstreamError::NotConfigured(_) => None,
        }
    }
}

/// A source of movie metadata.
#[async_trait]
pub trait MovieSource: Send + Sync {
    /// Fetch popular pages `1..=total_pages` one after another and concatenate them.
    ///
    /// Any page failure fails the whole call.
    async fn fetch_popular(&self, total_pages: u32) -> Result<Vec<Movie>, UpstreamError>;

    /// One page of keyword search results. An empty page is not an error.
    async fn fetch_by_query(&self, query: &str, page: u32) -> Result<SearchPage, UpstreamError>;

    /// Single lookup; `Ok(None)` when the source has no such id.
    async fn fetch_by_id(&self, id: u32) -> Result<Option<Movie>, UpstreamError>;
}

/// Source used when TMDB is not configured. Every call fails with `NotConfigured`.
#[derive(Debug, Default, Clone)]
pub struct UnconfiguredSource;

impl UnconfiguredSource {
    fn error() -> UpstreamError {
        UpstreamError::NotConfigured("TMDB client not configured".to_string())
    }
}

#[async_trait]
impl MovieSource for UnconfiguredSource {
    async fn fetch_popular(&self, _total_pages: u32) -> Result<Vec<Movie>, UpstreamError> {
        Err(Self::error())
    }

    async fn fetch_by_query(&self, _query: &str, _page: u32) -> Result<SearchPage, UpstreamError> {
        Err(Self::error())
    }

    async fn fetch_by_id(&self, _id: u32) -> Result<Option<Movie>, UpstreamError> {
        Err(Self::error())
    }
}
