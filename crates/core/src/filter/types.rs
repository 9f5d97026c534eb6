//! Filter options and the compiled query they produce.

use chrono::NaiveDate;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

/// Columns a listing may be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Popularity,
    ReleaseDate,
    VoteAverage,
    Title,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Popularity => "popularity",
            SortField::ReleaseDate => "release_date",
            SortField::VoteAverage => "vote_average",
            SortField::Title => "title",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "popularity" => Some(SortField::Popularity),
            "release_date" => Some(SortField::ReleaseDate),
            "vote_average" => Some(SortField::VoteAverage),
            "title" => Some(SortField::Title),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

/// A sort key and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(field: SortField, order: SortOrder) -> Self {
        Self { field, order }
    }

    /// Parse the `field.order` form, e.g. `popularity.desc`.
    pub fn parse(value: &str) -> Option<Self> {
        let (field, order) = value.split_once('.')?;
        Some(Self {
            field: SortField::parse(field)?,
            order: SortOrder::parse(order)?,
        })
    }
}

/// Optional constraints for a movie listing.
///
/// Every `None`/empty field means "no constraint". Input is assumed to be
/// validated by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieFilter {
    /// Inclusive lower bound on release date.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound on release date.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Exact original-language code.
    #[serde(default)]
    pub language: Option<String>,
    /// Minimum vote average.
    #[serde(default)]
    pub min_rating: Option<f64>,
    /// Minimum vote count.
    #[serde(default)]
    pub min_vote_count: Option<u32>,
    /// `Some(false)` hides adult titles; anything else shows everything.
    #[serde(default)]
    pub include_adult: Option<bool>,
    /// Case-insensitive substring of title or original title.
    #[serde(default)]
    pub keyword: Option<String>,
    /// Matches movies sharing at least one genre with this set.
    #[serde(default)]
    pub genres: Vec<u32>,
    #[serde(default)]
    pub sort: Option<SortSpec>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

impl Default for MovieFilter {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            language: None,
            min_rating: None,
            min_vote_count: None,
            include_adult: None,
            keyword: None,
            genres: Vec::new(),
            sort: None,
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl MovieFilter {
    /// Unfiltered listing window.
    pub fn page(page: u32, limit: u32) -> Self {
        Self {
            page,
            limit,
            ..Default::default()
        }
    }

    pub fn with_sort(mut self, sort: Option<SortSpec>) -> Self {
        self.sort = sort;
        self
    }

    /// Row offset of the requested page (pages are 1-based).
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.limit)
    }
}

/// One SQL condition with its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Predicate {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// A compiled filter, ready to run against the `movies` table.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterQuery {
    /// Conditions joined with AND.
    pub predicates: Vec<String>,
    /// Positional parameters for `predicates`, in order.
    pub params: Vec<Value>,
    /// ORDER BY body without the keyword.
    pub order_by: String,
    pub limit: u32,
    pub offset: u64,
}

impl FilterQuery {
    /// `WHERE ...` or an empty string when unconstrained.
    pub fn where_clause(&self) -> String {
        if self.predicates.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.predicates.join(" AND "))
        }
    }

    /// Paged SELECT of the given columns.
    pub fn select_sql(&self, columns: &str) -> String {
        format!(
            "SELECT {} FROM movies {} ORDER BY {} LIMIT {} OFFSET {}",
            columns,
            self.where_clause(),
            self.order_by,
            self.limit,
            self.offset
        )
    }

    /// COUNT over the same predicates, ignoring the page window.
    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM movies {}", self.where_clause())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_spec_parse() {
        assert_eq!(
            SortSpec::parse("popularity.desc"),
            Some(SortSpec::new(SortField::Popularity, SortOrder::Desc))
        );
        assert_eq!(
            SortSpec::parse("release_date.asc"),
            Some(SortSpec::new(SortField::ReleaseDate, SortOrder::Asc))
        );
        assert_eq!(SortSpec::parse("budget.desc"), None);
        assert_eq!(SortSpec::parse("title.sideways"), None);
        assert_eq!(SortSpec::parse("title"), None);
    }

    #[test]
    fn test_offset() {
        assert_eq!(MovieFilter::page(1, 20).offset(), 0);
        assert_eq!(MovieFilter::page(3, 20).offset(), 40);
        assert_eq!(MovieFilter::page(0, 20).offset(), 0);
    }

    #[test]
    fn test_filter_defaults_from_json() {
        let filter: MovieFilter = serde_json::from_str("{}").unwrap();
        assert_eq!(filter, MovieFilter::default());
        assert_eq!(filter.page, 1);
        assert_eq!(filter.limit, 20);
    }

    #[test]
    fn test_where_clause_empty() {
        let query = FilterQuery {
            predicates: vec![],
            params: vec![],
            order_by: "id ASC".to_string(),
            limit: 10,
            offset: 0,
        };
        assert_eq!(query.where_clause(), "");
        assert_eq!(query.count_sql().trim(), "SELECT COUNT(*) FROM movies");
    }
}
