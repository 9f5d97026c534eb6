//! Testing utilities and mock implementations.
//!
//! The catalog can be exercised end to end with a real (in-memory) SQLite
//! store and a [`MockMovieSource`] in place of TMDB.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cinecache_core::testing::{MockMovieSource, fixtures};
//! use cinecache_core::{CatalogService, SqliteStore};
//!
//! let store = Arc::new(SqliteStore::in_memory()?);
//! let source = Arc::new(MockMovieSource::new());
//! source.add_movie(fixtures::movie(603, "The Matrix")).await;
//!
//! let catalog = CatalogService::new(store.clone(), store, source);
//! ```

mod mock_movie_source;

pub use mock_movie_source::{MockMovieSource, RecordedSourceCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::NaiveDate;

    use crate::store::Movie;
    use crate::upstream::SearchPage;

    /// A movie with only id and title set.
    pub fn movie(id: u32, title: &str) -> Movie {
        Movie::new(id, title)
    }

    /// A fully populated movie with reasonable defaults.
    pub fn detailed_movie(id: u32, title: &str, year: i32) -> Movie {
        Movie {
            overview: Some(format!("A movie about {}.", title.to_lowercase())),
            release_date: NaiveDate::from_ymd_opt(year, 6, 15),
            poster_path: Some("/poster.jpg".to_string()),
            backdrop_path: Some("/backdrop.jpg".to_string()),
            vote_average: Some(7.5),
            vote_count: Some(1200),
            popularity: Some(42.0),
            genre_ids: vec![18, 53],
            original_language: Some("en".to_string()),
            original_title: Some(title.to_string()),
            ..Movie::new(id, title)
        }
    }

    /// A movie for filter tests.
    pub fn rated_movie(id: u32, title: &str, release: &str, rating: f64, adult: bool) -> Movie {
        Movie {
            release_date: NaiveDate::parse_from_str(release, "%Y-%m-%d").ok(),
            vote_average: Some(rating),
            adult,
            ..Movie::new(id, title)
        }
    }

    /// A search response page.
    pub fn search_page(movies: Vec<Movie>, total_pages: u32, total_results: u32) -> SearchPage {
        SearchPage {
            movies,
            total_pages,
            total_results,
        }
    }
}
