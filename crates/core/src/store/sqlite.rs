//! SQLite-backed movie store and query-page cache.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::{
    unique_movie_ids, MediaType, Movie, MovieStore, MovieSuggestion, NewQueryPage, PageInsert,
    QueryPage, QueryPageCache, StoreError,
};
use crate::filter::{fold_case, like_pattern, order_by_clause, FilterQuery, SortSpec};

const MOVIE_COLUMNS: &str = "id, title, overview, release_date, poster_path, backdrop_path, \
     vote_average, vote_count, popularity, genre_ids, original_language, original_title, \
     adult, media_type, video";

const PAGE_COLUMNS: &str =
    "query, normalized_query, page_number, movie_ids, total_pages, total_results, created_at";

/// SQLite-backed implementation of [`MovieStore`] and [`QueryPageCache`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS movies (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                overview TEXT,
                release_date TEXT,
                poster_path TEXT,
                backdrop_path TEXT,
                vote_average REAL,
                vote_count INTEGER,
                popularity REAL,
                genre_ids TEXT NOT NULL DEFAULT '[]',
                original_language TEXT,
                original_title TEXT,
                adult INTEGER NOT NULL DEFAULT 0,
                media_type TEXT NOT NULL DEFAULT 'movie' CHECK (media_type IN ('movie', 'tv')),
                video INTEGER NOT NULL DEFAULT 0,
                -- Lowercased copies for keyword matching; LIKE only folds ASCII
                title_folded TEXT NOT NULL,
                original_title_folded TEXT,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_movies_release_date ON movies(release_date);
            CREATE INDEX IF NOT EXISTS idx_movies_popularity ON movies(popularity);
            CREATE INDEX IF NOT EXISTS idx_movies_vote_average ON movies(vote_average);
            CREATE INDEX IF NOT EXISTS idx_movies_title ON movies(title);

            -- One row per (normalized query, page); written once, never updated
            CREATE TABLE IF NOT EXISTS movie_pages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                query TEXT NOT NULL,
                normalized_query TEXT NOT NULL,
                page_number INTEGER NOT NULL CHECK (page_number >= 1),
                movie_ids TEXT NOT NULL,
                total_pages INTEGER NOT NULL,
                total_results INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(normalized_query, page_number)
            );
            "#,
        )?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".to_string()))
    }

    fn read_page(
        conn: &Connection,
        normalized_query: &str,
        page: u32,
    ) -> Result<Option<QueryPage>, StoreError> {
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM movie_pages WHERE normalized_query = ? AND page_number = ?",
                    PAGE_COLUMNS
                ),
                params![normalized_query, page],
                PageRow::from_row,
            )
            .optional()?;

        row.map(PageRow::into_page).transpose()
    }
}

/// Raw `movies` row before JSON and date decoding.
struct MovieRow {
    id: u32,
    title: String,
    overview: Option<String>,
    release_date: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    vote_average: Option<f64>,
    vote_count: Option<u32>,
    popularity: Option<f64>,
    genre_ids: String,
    original_language: Option<String>,
    original_title: Option<String>,
    adult: bool,
    media_type: String,
    video: bool,
}

impl MovieRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            overview: row.get(2)?,
            release_date: row.get(3)?,
            poster_path: row.get(4)?,
            backdrop_path: row.get(5)?,
            vote_average: row.get(6)?,
            vote_count: row.get(7)?,
            popularity: row.get(8)?,
            genre_ids: row.get(9)?,
            original_language: row.get(10)?,
            original_title: row.get(11)?,
            adult: row.get(12)?,
            media_type: row.get(13)?,
            video: row.get(14)?,
        })
    }

    fn into_movie(self) -> Result<Movie, StoreError> {
        let genre_ids: Vec<u32> = serde_json::from_str(&self.genre_ids).map_err(|e| {
            StoreError::Corrupt(format!("movie {} genre_ids: {}", self.id, e))
        })?;
        let media_type = MediaType::parse(&self.media_type).ok_or_else(|| {
            StoreError::Corrupt(format!("movie {} media_type: {}", self.id, self.media_type))
        })?;
        let release_date = self
            .release_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());

        Ok(Movie {
            id: self.id,
            title: self.title,
            overview: self.overview,
            release_date,
            poster_path: self.poster_path,
            backdrop_path: self.backdrop_path,
            vote_average: self.vote_average,
            vote_count: self.vote_count,
            popularity: self.popularity,
            genre_ids,
            original_language: self.original_language,
            original_title: self.original_title,
            adult: self.adult,
            media_type,
            video: self.video,
        })
    }
}

struct PageRow {
    query: String,
    normalized_query: String,
    page: u32,
    movie_ids: String,
    total_pages: u32,
    total_results: u32,
    created_at: String,
}

impl PageRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            query: row.get(0)?,
            normalized_query: row.get(1)?,
            page: row.get(2)?,
            movie_ids: row.get(3)?,
            total_pages: row.get(4)?,
            total_results: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn into_page(self) -> Result<QueryPage, StoreError> {
        let movie_ids: Vec<u32> = serde_json::from_str(&self.movie_ids).map_err(|e| {
            StoreError::Corrupt(format!(
                "page {:?}/{} movie_ids: {}",
                self.normalized_query, self.page, e
            ))
        })?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                StoreError::Corrupt(format!(
                    "page {:?}/{} created_at: {}",
                    self.normalized_query, self.page, e
                ))
            })?;

        Ok(QueryPage {
            query: self.query,
            normalized_query: self.normalized_query,
            page: self.page,
            movie_ids,
            total_pages: self.total_pages,
            total_results: self.total_results,
            created_at,
        })
    }
}

fn collect_movies(rows: Vec<MovieRow>) -> Result<Vec<Movie>, StoreError> {
    rows.into_iter().map(MovieRow::into_movie).collect()
}

impl MovieStore for SqliteStore {
    fn upsert(&self, movie: &Movie) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let genre_ids = serde_json::to_string(&movie.genre_ids)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let release_date = movie
            .release_date
            .map(|d| d.format("%Y-%m-%d").to_string());
        let title_folded = fold_case(&movie.title);
        let original_title_folded = movie.original_title.as_deref().map(fold_case);
        let now = Utc::now().to_rfc3339();

        conn.execute(
            r#"
            INSERT INTO movies (
                id, title, overview, release_date, poster_path, backdrop_path,
                vote_average, vote_count, popularity, genre_ids, original_language,
                original_title, adult, media_type, video, title_folded,
                original_title_folded, updated_at
            )
            VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18
            )
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                overview = excluded.overview,
                release_date = excluded.release_date,
                poster_path = excluded.poster_path,
                backdrop_path = excluded.backdrop_path,
                vote_average = excluded.vote_average,
                vote_count = excluded.vote_count,
                popularity = excluded.popularity,
                genre_ids = excluded.genre_ids,
                original_language = excluded.original_language,
                original_title = excluded.original_title,
                adult = excluded.adult,
                media_type = excluded.media_type,
                video = excluded.video,
                title_folded = excluded.title_folded,
                original_title_folded = excluded.original_title_folded,
                updated_at = excluded.updated_at
            "#,
            params![
                movie.id,
                movie.title,
                movie.overview,
                release_date,
                movie.poster_path,
                movie.backdrop_path,
                movie.vote_average,
                movie.vote_count,
                movie.popularity,
                genre_ids,
                movie.original_language,
                movie.original_title,
                movie.adult,
                movie.media_type.as_str(),
                movie.video,
                title_folded,
                original_title_folded,
                now,
            ],
        )?;

        Ok(())
    }

    fn get(&self, id: u32) -> Result<Option<Movie>, StoreError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM movies WHERE id = ?", MOVIE_COLUMNS),
                params![id],
                MovieRow::from_row,
            )
            .optional()?;

        row.map(MovieRow::into_movie).transpose()
    }

    fn find_by_ids(&self, ids: &[u32], sort: Option<SortSpec>) -> Result<Vec<Movie>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut sql = format!(
            "SELECT {} FROM movies WHERE id IN ({})",
            MOVIE_COLUMNS, placeholders
        );
        if sort.is_some() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order_by_clause(sort));
        }

        let rows = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(ids.iter()), MovieRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };
        let movies = collect_movies(rows)?;

        if sort.is_some() {
            return Ok(movies);
        }

        // Restore the caller's order.
        let mut by_id: HashMap<u32, Movie> = movies.into_iter().map(|m| (m.id, m)).collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    fn find_filtered(&self, query: &FilterQuery) -> Result<(Vec<Movie>, u64), StoreError> {
        let (rows, total) = {
            let conn = self.conn()?;
            let total: i64 = conn.query_row(
                &query.count_sql(),
                params_from_iter(query.params.iter()),
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(&query.select_sql(MOVIE_COLUMNS))?;
            let rows = stmt
                .query_map(params_from_iter(query.params.iter()), MovieRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            (rows, total)
        };

        Ok((collect_movies(rows)?, total.max(0) as u64))
    }

    fn suggestions(&self, keyword: &str, limit: u32) -> Result<Vec<MovieSuggestion>, StoreError> {
        let keyword = keyword.trim();
        if keyword.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, title FROM movies
            WHERE title_folded LIKE ?1 ESCAPE '\' OR original_title_folded LIKE ?1 ESCAPE '\'
            ORDER BY popularity DESC, id ASC
            LIMIT ?2
            "#,
        )?;
        let suggestions = stmt
            .query_map(params![like_pattern(keyword), limit], |row| {
                Ok(MovieSuggestion {
                    id: row.get(0)?,
                    title: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(suggestions)
    }

    fn count(&self) -> Result<u64, StoreError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM movies", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

impl QueryPageCache for SqliteStore {
    fn lookup_page(
        &self,
        normalized_query: &str,
        page: u32,
    ) -> Result<Option<QueryPage>, StoreError> {
        let conn = self.conn()?;
        Self::read_page(&conn, normalized_query, page)
    }

    fn insert_page_if_absent(&self, page: NewQueryPage) -> Result<PageInsert, StoreError> {
        let movie_ids = unique_movie_ids(&page.movie_ids);
        if movie_ids.is_empty() || page.page == 0 {
            return Ok(PageInsert::Rejected);
        }

        let ids_json =
            serde_json::to_string(&movie_ids).map_err(|e| StoreError::Database(e.to_string()))?;
        let created_at = Utc::now();

        let conn = self.conn()?;
        let inserted = conn.execute(
            r#"
            INSERT INTO movie_pages (
                query, normalized_query, page_number, movie_ids,
                total_pages, total_results, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(normalized_query, page_number) DO NOTHING
            "#,
            params![
                page.query,
                page.normalized_query,
                page.page,
                ids_json,
                page.total_pages,
                page.total_results,
                created_at.to_rfc3339(),
            ],
        )?;

        if inserted == 1 {
            return Ok(PageInsert::Inserted(QueryPage {
                query: page.query,
                normalized_query: page.normalized_query,
                page: page.page,
                movie_ids,
                total_pages: page.total_pages,
                total_results: page.total_results,
                created_at,
            }));
        }

        match Self::read_page(&conn, &page.normalized_query, page.page)? {
            Some(existing) => Ok(PageInsert::AlreadyExists(existing)),
            None => Err(StoreError::Database(format!(
                "page {:?}/{} neither inserted nor found",
                page.normalized_query, page.page
            ))),
        }
    }

    fn page_count(&self) -> Result<u64, StoreError> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM movie_pages", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::filter::{build_filter_query, MovieFilter, SortField, SortOrder};

    fn movie(id: u32, title: &str) -> Movie {
        Movie::new(id, title)
    }

    fn dated(id: u32, title: &str, date: &str, rating: f64, adult: bool) -> Movie {
        Movie {
            release_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").ok(),
            vote_average: Some(rating),
            adult,
            ..Movie::new(id, title)
        }
    }

    #[test]
    fn test_upsert_and_get() {
        let store = SqliteStore::in_memory().unwrap();
        let mut m = dated(550, "Fight Club", "1999-10-15", 8.4, false);
        m.genre_ids = vec![18, 53];
        m.media_type = MediaType::Movie;
        m.original_language = Some("en".to_string());
        m.vote_count = Some(27000);

        store.upsert(&m).unwrap();
        assert_eq!(store.get(550).unwrap(), Some(m));
        assert_eq!(store.get(551).unwrap(), None);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_upsert_overwrites_all_fields() {
        let store = SqliteStore::in_memory().unwrap();
        let mut m = dated(1, "Old Title", "2000-01-01", 5.0, false);
        m.genre_ids = vec![1, 2];
        m.overview = Some("old".to_string());
        store.upsert(&m).unwrap();

        let updated = Movie {
            overview: None,
            genre_ids: vec![9],
            vote_average: Some(6.5),
            media_type: MediaType::Tv,
            ..Movie::new(1, "New Title")
        };
        store.upsert(&updated).unwrap();

        assert_eq!(store.get(1).unwrap(), Some(updated));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_find_by_ids_keeps_caller_order() {
        let store = SqliteStore::in_memory().unwrap();
        for (id, title) in [(1, "A"), (2, "B"), (3, "C")] {
            store.upsert(&movie(id, title)).unwrap();
        }

        let found = store.find_by_ids(&[3, 99, 1, 2], None).unwrap();
        let ids: Vec<u32> = found.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert!(store.find_by_ids(&[], None).unwrap().is_empty());
    }

    #[test]
    fn test_find_by_ids_with_sort() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert(&dated(1, "Low", "2000-01-01", 3.0, false)).unwrap();
        store.upsert(&dated(2, "High", "2000-01-01", 9.0, false)).unwrap();
        store.upsert(&dated(3, "Mid", "2000-01-01", 6.0, false)).unwrap();

        let sort = SortSpec::new(SortField::VoteAverage, SortOrder::Desc);
        let found = store.find_by_ids(&[1, 2, 3], Some(sort)).unwrap();
        let ids: Vec<u32> = found.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_filter_scenario() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert(&dated(1, "Nineties", "1999-05-01", 8.0, false)).unwrap();
        store.upsert(&dated(2, "Good Two", "2001-05-01", 7.5, false)).unwrap();
        store.upsert(&dated(3, "Adult", "2002-05-01", 9.0, true)).unwrap();
        store.upsert(&dated(4, "Weak", "2003-05-01", 5.0, false)).unwrap();

        let filter = MovieFilter {
            start_date: NaiveDate::from_ymd_opt(2000, 1, 1),
            min_rating: Some(7.0),
            include_adult: Some(false),
            ..Default::default()
        };
        let (movies, total) = store.find_filtered(&build_filter_query(&filter)).unwrap();

        assert_eq!(total, 1);
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].id, 2);
    }

    #[test]
    fn test_genre_overlap() {
        let store = SqliteStore::in_memory().unwrap();
        let mut a = movie(1, "A");
        a.genre_ids = vec![3, 9];
        let mut b = movie(2, "B");
        b.genre_ids = vec![4, 5];
        let c = movie(3, "C");
        for m in [&a, &b, &c] {
            store.upsert(m).unwrap();
        }

        let filter = MovieFilter {
            genres: vec![1, 2, 3],
            ..Default::default()
        };
        let (movies, total) = store.find_filtered(&build_filter_query(&filter)).unwrap();
        assert_eq!(total, 1);
        assert_eq!(movies[0].id, 1);
    }

    #[test]
    fn test_sort_excludes_nulls_from_data_and_count() {
        let store = SqliteStore::in_memory().unwrap();
        let mut with_pop = movie(1, "Known");
        with_pop.popularity = Some(12.5);
        let mut other = movie(2, "Also Known");
        other.popularity = Some(99.0);
        store.upsert(&with_pop).unwrap();
        store.upsert(&other).unwrap();
        store.upsert(&movie(3, "Unknown")).unwrap();

        let filter = MovieFilter::page(1, 20)
            .with_sort(Some(SortSpec::new(SortField::Popularity, SortOrder::Desc)));
        let (movies, total) = store.find_filtered(&build_filter_query(&filter)).unwrap();

        assert_eq!(total, 2);
        let ids: Vec<u32> = movies.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![2, 1]);

        let (_, unsorted_total) = store
            .find_filtered(&build_filter_query(&MovieFilter::page(1, 20)))
            .unwrap();
        assert_eq!(unsorted_total, 3);
    }

    #[test]
    fn test_filtered_pagination_counts_all_matches() {
        let store = SqliteStore::in_memory().unwrap();
        for id in 1..=7 {
            store.upsert(&movie(id, &format!("Movie {}", id))).unwrap();
        }

        let (movies, total) = store
            .find_filtered(&build_filter_query(&MovieFilter::page(2, 3)))
            .unwrap();
        assert_eq!(total, 7);
        let ids: Vec<u32> = movies.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![4, 5, 6]);
    }

    #[test]
    fn test_keyword_matches_original_title_case_insensitively() {
        let store = SqliteStore::in_memory().unwrap();
        let mut m = movie(1, "A Origem");
        m.original_title = Some("Inception".to_string());
        store.upsert(&m).unwrap();
        store.upsert(&movie(2, "Interstellar")).unwrap();

        let filter = MovieFilter {
            keyword: Some("INCEP".to_string()),
            ..Default::default()
        };
        let (movies, total) = store.find_filtered(&build_filter_query(&filter)).unwrap();
        assert_eq!(total, 1);
        assert_eq!(movies[0].id, 1);
    }

    #[test]
    fn test_keyword_folds_non_ascii_case() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert(&movie(1, "Ação Mortal")).unwrap();
        let mut remake = movie(2, "Deadly Action");
        remake.original_title = Some("ÉLITE DA AÇÃO".to_string());
        store.upsert(&remake).unwrap();
        store.upsert(&movie(3, "Comédia")).unwrap();

        let filter = MovieFilter {
            keyword: Some("AÇÃO".to_string()),
            ..Default::default()
        };
        let (movies, total) = store.find_filtered(&build_filter_query(&filter)).unwrap();
        assert_eq!(total, 2);
        let ids: Vec<u32> = movies.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2]);

        assert_eq!(store.suggestions("ação", 5).unwrap().len(), 2);
        assert_eq!(store.suggestions("AÇÃO", 5).unwrap().len(), 2);
        let comedies = store.suggestions("COMÉ", 5).unwrap();
        assert_eq!(comedies.len(), 1);
        assert_eq!(comedies[0].title, "Comédia");
    }

    #[test]
    fn test_keyword_follows_title_changes() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert(&movie(1, "Órfã")).unwrap();
        store.upsert(&movie(1, "A Órfã: Primeira Morte")).unwrap();

        assert_eq!(store.suggestions("PRIMEIRA", 5).unwrap().len(), 1);
        assert_eq!(store.suggestions("órfã", 5).unwrap()[0].title, "A Órfã: Primeira Morte");
    }

    #[test]
    fn test_suggestions() {
        let store = SqliteStore::in_memory().unwrap();
        for (id, title, pop) in [
            (1, "Batman Begins", 50.0),
            (2, "The Batman", 90.0),
            (3, "Batman Returns", 20.0),
            (4, "Superman", 80.0),
        ] {
            let mut m = movie(id, title);
            m.popularity = Some(pop);
            store.upsert(&m).unwrap();
        }

        let suggestions = store.suggestions("batman", 2).unwrap();
        assert_eq!(
            suggestions,
            vec![
                MovieSuggestion {
                    id: 2,
                    title: "The Batman".to_string()
                },
                MovieSuggestion {
                    id: 1,
                    title: "Batman Begins".to_string()
                },
            ]
        );
        assert!(store.suggestions("  ", 5).unwrap().is_empty());
        assert!(store.suggestions("100%", 5).unwrap().is_empty());
    }

    #[test]
    fn test_page_insert_and_lookup() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.lookup_page("batman", 1).unwrap(), None);

        let result = store
            .insert_page_if_absent(NewQueryPage::new("Batman", 1, &[5, 3, 5, 0], 4, 77))
            .unwrap();
        let inserted = match result {
            PageInsert::Inserted(page) => page,
            other => panic!("expected insert, got {:?}", other),
        };
        assert_eq!(inserted.movie_ids, vec![5, 3]);

        let cached = store.lookup_page("batman", 1).unwrap().unwrap();
        assert_eq!(cached.query, "Batman");
        assert_eq!(cached.movie_ids, vec![5, 3]);
        assert_eq!(cached.total_pages, 4);
        assert_eq!(cached.total_results, 77);
        assert_eq!(store.lookup_page("batman", 2).unwrap(), None);
        assert_eq!(store.page_count().unwrap(), 1);
    }

    #[test]
    fn test_page_insert_rejects_empty_ids() {
        let store = SqliteStore::in_memory().unwrap();
        let result = store
            .insert_page_if_absent(NewQueryPage::new("nothing", 1, &[0, 0], 1, 0))
            .unwrap();
        assert_eq!(result, PageInsert::Rejected);
        assert_eq!(store.page_count().unwrap(), 0);
    }

    #[test]
    fn test_second_insert_returns_existing_row() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .insert_page_if_absent(NewQueryPage::new("Batman", 1, &[1, 2], 3, 50))
            .unwrap();

        let result = store
            .insert_page_if_absent(NewQueryPage::new("  BATMAN", 1, &[9], 8, 160))
            .unwrap();
        match result {
            PageInsert::AlreadyExists(page) => {
                assert_eq!(page.query, "Batman");
                assert_eq!(page.movie_ids, vec![1, 2]);
                assert_eq!(page.total_pages, 3);
            }
            other => panic!("expected existing row, got {:?}", other),
        }
        assert_eq!(store.page_count().unwrap(), 1);
    }

    #[test]
    fn test_corrupt_page_timestamp_is_reported() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .insert_page_if_absent(NewQueryPage::new("Dune", 1, &[438631], 1, 1))
            .unwrap();
        store
            .conn()
            .unwrap()
            .execute("UPDATE movie_pages SET created_at = 'yesterday'", [])
            .unwrap();

        let result = store.lookup_page("dune", 1);
        assert!(matches!(result, Err(StoreError::Corrupt(_))), "got {:?}", result);
    }

    #[test]
    fn test_concurrent_double_insert_keeps_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::new(&dir.path().join("race.db")).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .insert_page_if_absent(NewQueryPage::new("dune", 1, &[10 + i], 2, 30 + i))
                        .unwrap()
                })
            })
            .collect();

        let results: Vec<PageInsert> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let inserted = results
            .iter()
            .filter(|r| matches!(r, PageInsert::Inserted(_)))
            .count();
        assert_eq!(inserted, 1);

        let stored = store.lookup_page("dune", 1).unwrap().unwrap();
        for result in &results {
            let page = result.page().unwrap();
            assert_eq!(page.movie_ids, stored.movie_ids);
            assert_eq!(page.total_results, stored.total_results);
        }
        assert_eq!(store.page_count().unwrap(), 1);
    }

    #[test]
    fn test_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movies.db");
        {
            let store = SqliteStore::new(&path).unwrap();
            store.upsert(&movie(7, "Seven")).unwrap();
        }

        let reopened = SqliteStore::new(&path).unwrap();
        assert_eq!(reopened.get(7).unwrap().unwrap().title, "Seven");
    }
}
