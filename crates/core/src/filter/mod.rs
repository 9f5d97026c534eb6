//! Filter composition for movie listings.
//!
//! A [`MovieFilter`] is compiled into a [`FilterQuery`] by walking an ordered
//! table of rules. Each rule pairs an applicability check with a predicate
//! builder, so an absent option never contributes a condition.

mod types;

pub use types::*;

use rusqlite::types::Value;

/// A single optional constraint.
struct FilterRule {
    name: &'static str,
    applies: fn(&MovieFilter) -> bool,
    build: fn(&MovieFilter) -> Option<Predicate>,
}

/// Rules in the order their predicates appear in the WHERE clause.
const FILTER_RULES: &[FilterRule] = &[
    FilterRule {
        name: "start_date",
        applies: has_start_date,
        build: start_date_predicate,
    },
    FilterRule {
        name: "end_date",
        applies: has_end_date,
        build: end_date_predicate,
    },
    FilterRule {
        name: "language",
        applies: has_language,
        build: language_predicate,
    },
    FilterRule {
        name: "min_rating",
        applies: has_min_rating,
        build: min_rating_predicate,
    },
    FilterRule {
        name: "min_vote_count",
        applies: has_min_vote_count,
        build: min_vote_count_predicate,
    },
    FilterRule {
        name: "exclude_adult",
        applies: excludes_adult,
        build: exclude_adult_predicate,
    },
    FilterRule {
        name: "keyword",
        applies: has_keyword,
        build: keyword_predicate,
    },
    FilterRule {
        name: "genres",
        applies: has_genres,
        build: genres_predicate,
    },
    FilterRule {
        name: "sort_key_present",
        applies: has_sort,
        build: sort_key_predicate,
    },
];

/// Compile a filter into predicates, ordering and a page window.
pub fn build_filter_query(filter: &MovieFilter) -> FilterQuery {
    let mut predicates = Vec::new();
    let mut params = Vec::new();

    for rule in FILTER_RULES.iter().filter(|rule| (rule.applies)(filter)) {
        if let Some(predicate) = (rule.build)(filter) {
            predicates.push(predicate.sql);
            params.extend(predicate.params);
        }
    }

    FilterQuery {
        predicates,
        params,
        order_by: order_by_clause(filter.sort),
        limit: filter.limit,
        offset: filter.offset(),
    }
}

/// Names of the rules that constrain this filter, for logging.
pub fn active_filters(filter: &MovieFilter) -> Vec<&'static str> {
    FILTER_RULES
        .iter()
        .filter(|rule| (rule.applies)(filter))
        .map(|rule| rule.name)
        .collect()
}

/// ORDER BY body for an optional sort. Ties and unsorted listings fall back to id.
pub fn order_by_clause(sort: Option<SortSpec>) -> String {
    match sort {
        Some(spec) => format!("{} {}, id ASC", spec.field.column(), spec.order.as_sql()),
        None => "id ASC".to_string(),
    }
}

/// Unicode lowercase, stored next to titles at upsert.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

/// `%keyword%` over the case-folded keyword, with LIKE wildcards escaped
/// (use with `ESCAPE '\'` against folded columns).
pub fn like_pattern(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len() + 2);
    escaped.push('%');
    for c in fold_case(keyword).chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn date_value(date: chrono::NaiveDate) -> Value {
    Value::Text(date.format("%Y-%m-%d").to_string())
}

fn has_start_date(f: &MovieFilter) -> bool {
    f.start_date.is_some()
}

fn start_date_predicate(f: &MovieFilter) -> Option<Predicate> {
    let date = f.start_date?;
    Some(Predicate::new("release_date >= ?", vec![date_value(date)]))
}

fn has_end_date(f: &MovieFilter) -> bool {
    f.end_date.is_some()
}

fn end_date_predicate(f: &MovieFilter) -> Option<Predicate> {
    let date = f.end_date?;
    Some(Predicate::new("release_date <= ?", vec![date_value(date)]))
}

fn has_language(f: &MovieFilter) -> bool {
    f.language.as_deref().is_some_and(|l| !l.is_empty())
}

fn language_predicate(f: &MovieFilter) -> Option<Predicate> {
    let language = f.language.clone()?;
    Some(Predicate::new(
        "original_language = ?",
        vec![Value::Text(language)],
    ))
}

// A zero bound matches every rated movie, so it is treated as absent.
fn has_min_rating(f: &MovieFilter) -> bool {
    f.min_rating.is_some_and(|r| r > 0.0)
}

fn min_rating_predicate(f: &MovieFilter) -> Option<Predicate> {
    let rating = f.min_rating?;
    Some(Predicate::new("vote_average >= ?", vec![Value::Real(rating)]))
}

fn has_min_vote_count(f: &MovieFilter) -> bool {
    f.min_vote_count.is_some_and(|c| c > 0)
}

fn min_vote_count_predicate(f: &MovieFilter) -> Option<Predicate> {
    let count = f.min_vote_count?;
    Some(Predicate::new(
        "vote_count >= ?",
        vec![Value::Integer(i64::from(count))],
    ))
}

fn excludes_adult(f: &MovieFilter) -> bool {
    f.include_adult == Some(false)
}

fn exclude_adult_predicate(_f: &MovieFilter) -> Option<Predicate> {
    Some(Predicate::new("adult = 0", vec![]))
}

fn has_keyword(f: &MovieFilter) -> bool {
    f.keyword.as_deref().is_some_and(|k| !k.trim().is_empty())
}

fn keyword_predicate(f: &MovieFilter) -> Option<Predicate> {
    let pattern = like_pattern(f.keyword.as_deref()?.trim());
    Some(Predicate::new(
        "(title_folded LIKE ? ESCAPE '\\' OR original_title_folded LIKE ? ESCAPE '\\')",
        vec![Value::Text(pattern.clone()), Value::Text(pattern)],
    ))
}

fn has_genres(f: &MovieFilter) -> bool {
    !f.genres.is_empty()
}

fn genres_predicate(f: &MovieFilter) -> Option<Predicate> {
    let placeholders = vec!["?"; f.genres.len()].join(", ");
    let params = f
        .genres
        .iter()
        .map(|g| Value::Integer(i64::from(*g)))
        .collect();
    Some(Predicate::new(
        format!(
            "EXISTS (SELECT 1 FROM json_each(movies.genre_ids) WHERE json_each.value IN ({}))",
            placeholders
        ),
        params,
    ))
}

fn has_sort(f: &MovieFilter) -> bool {
    f.sort.is_some()
}

// Sorting drops rows whose sort key is NULL instead of ordering them last.
fn sort_key_predicate(f: &MovieFilter) -> Option<Predicate> {
    let sort = f.sort?;
    Some(Predicate::new(
        format!("{} IS NOT NULL", sort.field.column()),
        vec![],
    ))
}
