//! Request validation for the movie routes.
//!
//! Query strings arrive as raw strings so that a malformed number is reported
//! per field instead of being rejected wholesale by the extractor.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use cinecache_core::{MovieFilter, SortField, SortOrder, SortSpec};

pub const DEFAULT_LIST_LIMIT: u32 = 20;
pub const MAX_LIST_LIMIT: u32 = 50;
pub const DEFAULT_SUGGESTION_LIMIT: u32 = 5;
pub const MAX_SUGGESTION_LIMIT: u32 = 10;
pub const MAX_KEYWORD_LEN: usize = 255;
pub const MAX_VOTE_COUNT: i64 = 5000;
pub const MIN_RELEASE_YEAR: i32 = 1880;

static BR_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{2})/(\d{2})/(\d{4})$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every problem found in one request.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> Vec<&str> {
        self.0.iter().map(|e| e.field.as_str()).collect()
    }

    pub fn into_details(self) -> Vec<FieldError> {
        self.0
    }

    /// `Ok(value)` when nothing was pushed.
    pub fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

// ============================================================================
// Query string parameters
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub page: Option<String>,
    pub sort_by: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestionParams {
    pub keyword: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListRequest {
    pub page: u32,
    pub limit: u32,
    pub sort: Option<SortSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub page: u32,
    pub sort: Option<SortSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionRequest {
    pub keyword: String,
    pub limit: u32,
}

impl ListParams {
    pub fn validate(&self) -> Result<ListRequest, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let page = parse_page(self.page.as_deref(), &mut errors);
        let limit = parse_bounded(
            "limit",
            self.limit.as_deref(),
            1,
            MAX_LIST_LIMIT,
            DEFAULT_LIST_LIMIT,
            &mut errors,
        );
        let sort = parse_sort_by(self.sort_by.as_deref(), &mut errors);
        errors.finish(ListRequest { page, limit, sort })
    }
}

impl SearchParams {
    pub fn validate(&self) -> Result<SearchRequest, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let query = match self.query.as_deref() {
            None => {
                errors.push("query", "query is required");
                String::new()
            }
            Some(q) if q.trim().is_empty() => {
                errors.push("query", "query cannot be empty");
                String::new()
            }
            Some(q) => q.to_string(),
        };
        let page = parse_page(self.page.as_deref(), &mut errors);
        let sort = parse_sort_by(self.sort_by.as_deref(), &mut errors);
        errors.finish(SearchRequest { query, page, sort })
    }
}

impl SuggestionParams {
    pub fn validate(&self) -> Result<SuggestionRequest, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let keyword = self
            .keyword
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        if keyword.is_empty() {
            errors.push("keyword", "keyword is required");
        }
        let limit = parse_bounded(
            "limit",
            self.limit.as_deref(),
            1,
            MAX_SUGGESTION_LIMIT,
            DEFAULT_SUGGESTION_LIMIT,
            &mut errors,
        );
        errors.finish(SuggestionRequest { keyword, limit })
    }
}

/// Path id of `/movies/{id}`.
pub fn parse_movie_id(raw: &str) -> Result<u32, ValidationErrors> {
    match raw.trim().parse::<u32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ValidationErrors::single(
            "id",
            "id must be a positive integer",
        )),
    }
}

fn parse_page(raw: Option<&str>, errors: &mut ValidationErrors) -> u32 {
    let Some(raw) = raw else {
        return 1;
    };
    match raw.trim().parse::<i64>() {
        Ok(page) if page >= 1 && page <= i64::from(u32::MAX) => page as u32,
        Ok(_) => {
            errors.push("page", "page must be at least 1");
            1
        }
        Err(_) => {
            errors.push("page", "page must be an integer");
            1
        }
    }
}

fn parse_bounded(
    field: &str,
    raw: Option<&str>,
    min: u32,
    max: u32,
    default: u32,
    errors: &mut ValidationErrors,
) -> u32 {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<i64>() {
        Ok(value) if value >= i64::from(min) && value <= i64::from(max) => value as u32,
        Ok(_) => {
            errors.push(field, format!("{} must be between {} and {}", field, min, max));
            default
        }
        Err(_) => {
            errors.push(field, format!("{} must be an integer", field));
            default
        }
    }
}

fn parse_sort_by(raw: Option<&str>, errors: &mut ValidationErrors) -> Option<SortSpec> {
    let raw = raw?;
    let sort = SortSpec::parse(raw);
    if sort.is_none() {
        errors.push(
            "sort_by",
            "use field.order, e.g. popularity.desc (fields: popularity, release_date, vote_average, title)",
        );
    }
    sort
}

// ============================================================================
// JSON bodies
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct SortRequest {
    pub by: Option<String>,
    pub order: Option<String>,
}

/// Body of `POST /movies`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterRequest {
    /// `dd/mm/yyyy`, or empty for no bound.
    pub start_year: Option<String>,
    pub end_year: Option<String>,
    pub language: Option<String>,
    pub rating: Option<i64>,
    /// Minimum vote count.
    pub avaliation: Option<i64>,
    pub include_adult: Option<bool>,
    pub keyword: Option<String>,
    pub genres: Option<Vec<i64>>,
    pub sort: Option<SortRequest>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Body of `POST /movies/update`.
#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    pub pages: Option<i64>,
}

impl RefreshRequest {
    pub fn validate(&self) -> Result<u32, ValidationErrors> {
        match self.pages {
            Some(pages) if pages >= 1 && pages <= i64::from(u32::MAX) => Ok(pages as u32),
            Some(_) => Err(ValidationErrors::single(
                "pages",
                "at least 1 page is required",
            )),
            None => Err(ValidationErrors::single("pages", "pages is required")),
        }
    }
}

impl FilterRequest {
    /// Turn the body into a [`MovieFilter`], with release years checked
    /// against `current_year`.
    pub fn validate(&self, current_year: i32) -> Result<MovieFilter, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let start_date = self
            .start_year
            .as_deref()
            .and_then(|raw| check(&mut errors, "startYear", parse_br_date(raw, current_year)));
        let end_date = self
            .end_year
            .as_deref()
            .and_then(|raw| check(&mut errors, "endYear", parse_br_date(raw, current_year)));

        let min_rating = match self.rating {
            Some(r) if !(0..=10).contains(&r) => {
                errors.push("rating", "rating must be between 0 and 10");
                None
            }
            r => r.map(|r| r as f64),
        };

        let min_vote_count = match self.avaliation {
            Some(v) if v < 0 => {
                errors.push("avaliation", "minimum vote count is 0");
                None
            }
            Some(v) if v > MAX_VOTE_COUNT => {
                errors.push("avaliation", "maximum vote count is 5000");
                None
            }
            v => v.map(|v| v as u32),
        };

        let keyword = self
            .keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);
        if keyword
            .as_deref()
            .is_some_and(|k| k.chars().count() > MAX_KEYWORD_LEN)
        {
            errors.push("keyword", "keyword cannot exceed 255 characters");
        }

        let mut genres = Vec::new();
        for genre in self.genres.iter().flatten() {
            match u32::try_from(*genre) {
                Ok(id) if id >= 1 => genres.push(id),
                _ => errors.push("genres", format!("invalid genre id {}", genre)),
            }
        }

        let sort = self
            .sort
            .as_ref()
            .and_then(|s| parse_partial_sort(s, &mut errors));

        let page = match self.page {
            None => 1,
            Some(p) if p >= 1 && p <= i64::from(u32::MAX) => p as u32,
            Some(_) => {
                errors.push("page", "page must be at least 1");
                1
            }
        };

        let limit = match self.limit {
            None => DEFAULT_LIST_LIMIT,
            Some(l) if (1..=i64::from(MAX_LIST_LIMIT)).contains(&l) => l as u32,
            Some(_) => {
                errors.push("limit", "limit must be between 1 and 50");
                DEFAULT_LIST_LIMIT
            }
        };

        errors.finish(MovieFilter {
            start_date,
            end_date,
            language: self
                .language
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string),
            min_rating,
            min_vote_count,
            include_adult: self.include_adult,
            keyword,
            genres,
            sort,
            page,
            limit,
        })
    }
}

fn check<T>(errors: &mut ValidationErrors, field: &str, result: Result<T, String>) -> T
where
    T: Default,
{
    result.unwrap_or_else(|message| {
        errors.push(field, message);
        T::default()
    })
}

/// Both halves must be present for the sort to apply; each present half must be valid.
fn parse_partial_sort(sort: &SortRequest, errors: &mut ValidationErrors) -> Option<SortSpec> {
    let field = sort.by.as_deref().and_then(|by| {
        let field = SortField::parse(by);
        if field.is_none() {
            errors.push(
                "sort.by",
                "sort.by must be popularity, release_date, vote_average or title",
            );
        }
        field
    });
    let order = sort.order.as_deref().and_then(|order| {
        let parsed = SortOrder::parse(order);
        if parsed.is_none() {
            errors.push("sort.order", "sort.order must be asc or desc");
        }
        parsed
    });
    Some(SortSpec::new(field?, order?))
}

/// Parse `dd/mm/yyyy`. An empty string means "no bound".
pub fn parse_br_date(raw: &str, current_year: i32) -> Result<Option<NaiveDate>, String> {
    if raw.is_empty() {
        return Ok(None);
    }

    let caps = BR_DATE
        .captures(raw)
        .ok_or_else(|| "date must use the dd/mm/yyyy format".to_string())?;

    let invalid = || {
        format!(
            "date must be a valid date between {} and {}",
            MIN_RELEASE_YEAR, current_year
        )
    };
    let day: u32 = caps[1].parse().map_err(|_| invalid())?;
    let month: u32 = caps[2].parse().map_err(|_| invalid())?;
    let year: i32 = caps[3].parse().map_err(|_| invalid())?;

    if !(MIN_RELEASE_YEAR..=current_year).contains(&year) {
        return Err(invalid());
    }
    NaiveDate::from_ymd_opt(year, month, day)
        .map(Some)
        .ok_or_else(invalid)
}
