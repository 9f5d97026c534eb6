use serde::{Deserialize, Serialize};

use crate::store::Movie;

/// One page of upstream search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    /// Movies in upstream order.
    pub movies: Vec<Movie>,
    pub total_pages: u32,
    pub total_results: u32,
}

impl SearchPage {
    pub fn empty() -> Self {
        Self {
            movies: Vec::new(),
            total_pages: 1,
            total_results: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }
}
