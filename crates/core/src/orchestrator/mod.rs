//! Catalog service: read-through search over the local mirror.
//!
//! Searches consult the query-page cache first. A miss goes to upstream,
//! stores every returned movie and records the page so the next identical
//! search (after normalization) is served locally. Listings, filters and
//! suggestions only ever read the local store.

mod types;

pub use types::*;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::filter::{active_filters, build_filter_query, MovieFilter, SortSpec};
use crate::metrics;
use crate::normalize::normalize_query;
use crate::store::{Movie, MovieStore, MovieSuggestion, NewQueryPage, PageInsert, QueryPageCache};
use crate::upstream::MovieSource;

/// Composes the movie store, the page cache and the upstream source.
#[derive(Clone)]
pub struct CatalogService {
    movies: Arc<dyn MovieStore>,
    pages: Arc<dyn QueryPageCache>,
    source: Arc<dyn MovieSource>,
}

impl CatalogService {
    pub fn new(
        movies: Arc<dyn MovieStore>,
        pages: Arc<dyn QueryPageCache>,
        source: Arc<dyn MovieSource>,
    ) -> Self {
        Self {
            movies,
            pages,
            source,
        }
    }

    /// Keyword search with the query-page cache in front of upstream.
    ///
    /// On a hit the cached ids are resolved locally, in cached order unless a
    /// sort is given. On a miss the upstream page is returned in upstream order.
    pub async fn search_by_query(
        &self,
        query: &str,
        page: u32,
        sort: Option<SortSpec>,
    ) -> Result<SearchResult, CatalogError> {
        let normalized = normalize_query(query);

        if let Some(cached) = self.pages.lookup_page(&normalized, page)? {
            metrics::PAGE_CACHE_LOOKUPS.with_label_values(&["hit"]).inc();
            debug!(
                "Page cache hit: query='{}', page={}, ids={}",
                normalized,
                page,
                cached.movie_ids.len()
            );

            let movies = self.movies.find_by_ids(&cached.movie_ids, sort)?;
            return Ok(SearchResult {
                movies,
                total_pages: cached.total_pages,
                total_results: cached.total_results,
                from_cache: true,
                unsaved_ids: Vec::new(),
            });
        }

        metrics::PAGE_CACHE_LOOKUPS.with_label_values(&["miss"]).inc();
        debug!("Page cache miss: query='{}', page={}", normalized, page);

        let fetched = self.source.fetch_by_query(query, page).await?;
        if fetched.is_empty() {
            return Err(CatalogError::NotFound(format!(
                "no movies found for '{}'",
                query
            )));
        }

        let report = self.upsert_all(&fetched.movies);
        let unsaved_ids = report.failed_ids();
        if !unsaved_ids.is_empty() {
            warn!(
                "Caching page '{}'/{} with {} unsaved movie(s): {:?}",
                normalized,
                page,
                unsaved_ids.len(),
                unsaved_ids
            );
        }

        // Page ids are weak references, so the page is recorded even when some
        // movies failed to store; a later hit simply skips the missing ids.
        let ids: Vec<u32> = fetched.movies.iter().map(|m| m.id).collect();
        let candidate = NewQueryPage::new(
            query,
            page,
            &ids,
            fetched.total_pages,
            fetched.total_results,
        );

        let inserted = self.pages.insert_page_if_absent(candidate)?;
        metrics::PAGE_INSERTS
            .with_label_values(&[inserted.outcome()])
            .inc();

        let (movies, total_pages, total_results) = match inserted {
            PageInsert::Inserted(row) => (fetched.movies, row.total_pages, row.total_results),
            PageInsert::AlreadyExists(row) => {
                warn!(
                    "Page '{}'/{} was cached concurrently, serving the stored page",
                    normalized, page
                );
                let movies = self.movies.find_by_ids(&row.movie_ids, None)?;
                (movies, row.total_pages, row.total_results)
            }
            PageInsert::Rejected => (fetched.movies, fetched.total_pages, fetched.total_results),
        };

        Ok(SearchResult {
            movies,
            total_pages,
            total_results,
            from_cache: false,
            unsaved_ids,
        })
    }

    /// Local lookup, falling back to upstream and storing what it returns.
    pub async fn get_by_id(&self, id: u32) -> Result<Movie, CatalogError> {
        if let Some(movie) = self.movies.get(id)? {
            return Ok(movie);
        }

        debug!("Movie {} not stored locally, asking upstream", id);
        let movie = self
            .source
            .fetch_by_id(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("movie {}", id)))?;

        self.movies.upsert(&movie).inspect_err(|e| {
            metrics::MOVIE_UPSERTS.with_label_values(&["failed"]).inc();
            warn!("Failed to store movie {}: {}", id, e);
        })?;
        metrics::MOVIE_UPSERTS.with_label_values(&["ok"]).inc();

        Ok(movie)
    }

    /// Unfiltered listing of the local store.
    pub fn get_paginated(
        &self,
        page: u32,
        limit: u32,
        sort: Option<SortSpec>,
    ) -> Result<MovieListing, CatalogError> {
        self.get_by_filter(&MovieFilter::page(page, limit).with_sort(sort))
    }

    /// Filtered listing of the local store.
    pub fn get_by_filter(&self, filter: &MovieFilter) -> Result<MovieListing, CatalogError> {
        let query = build_filter_query(filter);
        debug!(
            "Filtering movies: filters={:?}, page={}, limit={}",
            active_filters(filter),
            filter.page,
            filter.limit
        );

        let (movies, total) = self.movies.find_filtered(&query)?;
        Ok(MovieListing::new(movies, total, filter.limit))
    }

    pub fn get_suggestions(
        &self,
        keyword: &str,
        limit: u32,
    ) -> Result<Vec<MovieSuggestion>, CatalogError> {
        Ok(self.movies.suggestions(keyword, limit)?)
    }

    /// Fetch `pages` pages of the popular listing and store every movie.
    ///
    /// Never touches the query-page cache.
    pub async fn refresh_popular(&self, pages: u32) -> Result<UpsertReport, CatalogError> {
        let movies = self.source.fetch_popular(pages).await?;
        if movies.is_empty() {
            return Err(CatalogError::NotFound(
                "upstream returned no popular movies".to_string(),
            ));
        }

        let report = self.upsert_all(&movies);
        info!(
            "Refreshed popular movies: pages={}, upserted={}, failed={}",
            pages,
            report.upserted,
            report.failed.len()
        );

        Ok(report)
    }

    pub fn stats(&self) -> Result<CatalogStats, CatalogError> {
        Ok(CatalogStats {
            movies: self.movies.count()?,
            cached_pages: self.pages.page_count()?,
        })
    }

    fn upsert_all(&self, movies: &[Movie]) -> UpsertReport {
        let mut report = UpsertReport::default();

        for movie in movies {
            match self.movies.upsert(movie) {
                Ok(()) => {
                    metrics::MOVIE_UPSERTS.with_label_values(&["ok"]).inc();
                    report.upserted += 1;
                }
                Err(e) => {
                    metrics::MOVIE_UPSERTS.with_label_values(&["failed"]).inc();
                    warn!("Failed to store movie {}: {}", movie.id, e);
                    report.failed.push(FailedUpsert {
                        id: movie.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }
}
