//! Movie catalog API handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use chrono::Datelike;
use serde::Serialize;
use tracing::info;

use cinecache_core::{FailedUpsert, Movie, MovieListing, MovieSuggestion, SearchResult};

use super::error::ApiError;
use super::validation::{
    parse_movie_id, FilterRequest, ListParams, RefreshRequest, SearchParams, SuggestionParams,
};
use crate::state::AppState;

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub movies: Vec<MovieSuggestion>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub message: String,
    /// Movies written to the store.
    pub total: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<FailedUpsert>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/movies/suggestions
///
/// Title suggestions for autocomplete, most popular first.
pub async fn suggestions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SuggestionParams>,
) -> Result<Json<SuggestionsResponse>, ApiError> {
    let request = params.validate()?;
    let movies = state
        .catalog()
        .get_suggestions(&request.keyword, request.limit)?;
    Ok(Json(SuggestionsResponse { movies }))
}

/// GET /api/v1/movies
pub async fn list_movies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<MovieListing>, ApiError> {
    let request = params.validate()?;
    let listing = state
        .catalog()
        .get_paginated(request.page, request.limit, request.sort)?;
    Ok(Json(listing))
}

/// POST /api/v1/movies
///
/// Filtered listing of stored movies.
pub async fn filter_movies(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FilterRequest>, JsonRejection>,
) -> Result<Json<MovieListing>, ApiError> {
    let Json(request) = payload?;
    let filter = request.validate(chrono::Utc::now().year())?;
    let listing = state.catalog().get_by_filter(&filter)?;
    Ok(Json(listing))
}

/// GET /api/v1/movies/search
///
/// Keyword search, answered from the query-page cache when possible.
pub async fn search_movies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResult>, ApiError> {
    let request = params.validate()?;
    let result = state
        .catalog()
        .search_by_query(&request.query, request.page, request.sort)
        .await?;
    Ok(Json(result))
}

/// POST /api/v1/movies/update
///
/// Pull the first `pages` pages of the popular listing into the store.
pub async fn refresh_popular(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let Json(request) = payload?;
    let pages = request.validate()?;

    let report = state.catalog().refresh_popular(pages).await?;
    info!(
        "Popular refresh via API: pages={}, stored={}",
        pages, report.upserted
    );

    Ok(Json(RefreshResponse {
        message: format!("{} movies updated", report.upserted),
        total: report.upserted,
        failed: report.failed,
    }))
}

/// GET /api/v1/movies/{id}
pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Movie>, ApiError> {
    let id = parse_movie_id(&id)?;
    let movie = state.catalog().get_by_id(id).await?;
    Ok(Json(movie))
}
