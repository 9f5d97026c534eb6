//! Mock upstream movie source for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::normalize::normalize_query;
use crate::store::Movie;
use crate::upstream::{MovieSource, SearchPage, UpstreamError};

/// A recorded upstream call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedSourceCall {
    /// One page of the popular listing.
    PopularPage { page: u32 },
    Search { query: String, page: u32 },
    ById { id: u32 },
}

/// Mock implementation of the MovieSource trait.
///
/// Provides controllable behavior for testing:
/// - Return configurable popular pages, search pages and single movies
/// - Track calls for assertions
/// - Simulate failures and slow responses
///
/// # Example
///
/// ```rust,ignore
/// use cinecache_core::testing::{MockMovieSource, fixtures};
///
/// let source = MockMovieSource::new();
/// source
///     .add_search_page("batman", 1, fixtures::search_page(vec![fixtures::movie(268, "Batman")], 1, 1))
///     .await;
///
/// let page = source.fetch_by_query("Batman", 1).await?;
/// assert_eq!(page.movies.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockMovieSource {
    /// Popular listing, index 0 is page 1.
    popular: Arc<RwLock<Vec<Vec<Movie>>>>,
    /// Search responses by (normalized query, page). The last response repeats.
    searches: Arc<RwLock<HashMap<(String, u32), VecDeque<SearchPage>>>>,
    /// Movies by ID.
    movies: Arc<RwLock<HashMap<u32, Movie>>>,
    /// Recorded calls.
    calls: Arc<RwLock<Vec<RecordedSourceCall>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<UpstreamError>>>,
    /// If set, the popular listing fails when it reaches this page.
    popular_failure: Arc<RwLock<Option<(u32, UpstreamError)>>>,
    /// Artificial delay before every response.
    latency: Arc<RwLock<Option<Duration>>>,
}

impl Default for MockMovieSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMovieSource {
    /// Create a new empty mock source.
    pub fn new() -> Self {
        Self {
            popular: Arc::new(RwLock::new(Vec::new())),
            searches: Arc::new(RwLock::new(HashMap::new())),
            movies: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            popular_failure: Arc::new(RwLock::new(None)),
            latency: Arc::new(RwLock::new(None)),
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Set the popular listing, one inner vec per page.
    pub async fn set_popular_pages(&self, pages: Vec<Vec<Movie>>) {
        *self.popular.write().await = pages;
    }

    /// Queue a search response for `query`/`page`.
    ///
    /// Responses are served in order; the last one keeps being served.
    pub async fn add_search_page(&self, query: &str, page: u32, response: SearchPage) {
        self.searches
            .write()
            .await
            .entry((normalize_query(query), page))
            .or_default()
            .push_back(response);
    }

    /// Add a movie for single lookups.
    pub async fn add_movie(&self, movie: Movie) {
        self.movies.write().await.insert(movie.id, movie);
    }

    /// Delay every response by `latency`.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = Some(latency);
    }

    // =========================================================================
    // Call Recording
    // =========================================================================

    /// Get all recorded calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedSourceCall> {
        self.calls.read().await.clone()
    }

    /// Clear recorded calls.
    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }

    /// Get the number of calls performed.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    // =========================================================================
    // Error Injection
    // =========================================================================

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: UpstreamError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make the popular listing fail once it reaches `page`.
    pub async fn fail_popular_at(&self, page: u32, error: UpstreamError) {
        *self.popular_failure.write().await = Some((page, error));
    }

    /// Clear any pending error.
    pub async fn clear_next_error(&self) {
        *self.next_error.write().await = None;
    }

    async fn take_error(&self) -> Option<UpstreamError> {
        self.next_error.write().await.take()
    }

    async fn record(&self, call: RecordedSourceCall) {
        self.calls.write().await.push(call);
    }

    async fn delay(&self) {
        let latency = *self.latency.read().await;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl MovieSource for MockMovieSource {
    async fn fetch_popular(&self, total_pages: u32) -> Result<Vec<Movie>, UpstreamError> {
        let mut movies = Vec::new();

        for page in 1..=total_pages {
            self.record(RecordedSourceCall::PopularPage { page }).await;
            if let Some(err) = self.take_error().await {
                return Err(err);
            }
            {
                let mut failure = self.popular_failure.write().await;
                if failure.as_ref().is_some_and(|(at, _)| *at == page) {
                    if let Some((_, err)) = failure.take() {
                        return Err(err);
                    }
                }
            }
            self.delay().await;

            let pages = self.popular.read().await;
            if let Some(results) = pages.get(page as usize - 1) {
                movies.extend(results.iter().cloned());
            }
        }

        Ok(movies)
    }

    async fn fetch_by_query(&self, query: &str, page: u32) -> Result<SearchPage, UpstreamError> {
        self.record(RecordedSourceCall::Search {
            query: query.to_string(),
            page,
        })
        .await;
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.delay().await;

        let mut searches = self.searches.write().await;
        let response = match searches.get_mut(&(normalize_query(query), page)) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        Ok(response.unwrap_or_else(SearchPage::empty))
    }

    async fn fetch_by_id(&self, id: u32) -> Result<Option<Movie>, UpstreamError> {
        self.record(RecordedSourceCall::ById { id }).await;
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.delay().await;

        Ok(self.movies.read().await.get(&id).cloned())
    }
}
