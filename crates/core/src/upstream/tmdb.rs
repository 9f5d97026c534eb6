//! TMDB (The Movie Database) API client.
//!
//! Accepts either a v4 read access token (sent as a bearer header) or a v3 API
//! key (sent as a query parameter). All responses are requested in the
//! configured language.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{MovieSource, SearchPage, UpstreamError};
use crate::metrics;
use crate::store::{parse_release_date, MediaType, Movie};

const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
const DEFAULT_LANGUAGE: &str = "pt-BR";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// TMDB API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbConfig {
    /// v4 read access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// v3 API key, used when no access token is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL (default: https://api.themoviedb.org/3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Response language (default: pt-BR).
    #[serde(default = "default_language")]
    pub language: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            api_key: None,
            base_url: None,
            language: default_language(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl TmdbConfig {
    pub fn has_credentials(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.access_token) || present(&self.api_key)
    }
}

enum Credentials {
    Bearer(String),
    ApiKey(String),
}

/// TMDB API client.
pub struct TmdbClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
    language: String,
}

impl TmdbClient {
    /// Create a new TMDB client.
    pub fn new(config: TmdbConfig) -> Result<Self, UpstreamError> {
        let credentials = match (config.access_token, config.api_key) {
            (Some(token), _) if !token.trim().is_empty() => Credentials::Bearer(token),
            (_, Some(key)) if !key.trim().is_empty() => Credentials::ApiKey(key),
            _ => {
                return Err(UpstreamError::NotConfigured(
                    "TMDB access token or API key is required".to_string(),
                ))
            }
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let base_url = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            credentials,
            language: config.language,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::Bearer(token) => request.bearer_auth(token),
            Credentials::ApiKey(key) => request.query(&[("api_key", key)]),
        }
    }

    /// GET `path` and decode the JSON body, recording request metrics under `endpoint`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, UpstreamError> {
        let started = Instant::now();
        let result = self.send_json(path, query).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(UpstreamError::NotFound(_)) => "not_found",
            Err(UpstreamError::RateLimited(_)) => "rate_limited",
            Err(_) => "error",
        };
        metrics::UPSTREAM_REQUESTS
            .with_label_values(&[endpoint, outcome])
            .inc();
        metrics::UPSTREAM_REQUEST_DURATION
            .with_label_values(&[endpoint])
            .observe(started.elapsed().as_secs_f64());

        result
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, UpstreamError> {
        let url = format!("{}{}", self.base_url, path);

        let request = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .query(&[("language", &self.language)])
            .query(query);
        let response = self.authorize(request).send().await?;

        let status = response.status();
        if status == 404 {
            return Err(UpstreamError::NotFound(path.to_string()));
        }

        let body = response.text().await?;
        if status == 429 {
            return Err(UpstreamError::RateLimited(error_message(
                &body,
                status.canonical_reason(),
            )));
        }
        if !status.is_success() {
            return Err(UpstreamError::Api {
                status: status.as_u16(),
                message: error_message(&body, status.canonical_reason()),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            UpstreamError::Parse(format!("Failed to parse {} response: {}", path, e))
        })
    }
}

/// TMDB's `status_message`, else the raw body, else the status reason.
fn error_message(body: &str, reason: Option<&str>) -> String {
    if let Ok(parsed) = serde_json::from_str::<TmdbErrorBody>(body) {
        if let Some(message) = parsed.status_message.filter(|m| !m.is_empty()) {
            return message;
        }
    }
    if !body.trim().is_empty() {
        return body.trim().to_string();
    }
    reason.unwrap_or("unknown error").to_string()
}

#[async_trait]
impl MovieSource for TmdbClient {
    async fn fetch_popular(&self, total_pages: u32) -> Result<Vec<Movie>, UpstreamError> {
        let mut movies = Vec::new();

        for page in 1..=total_pages {
            debug!("TMDB popular: page={}/{}", page, total_pages);
            let response: TmdbListResponse = self
                .get_json("popular", "/movie/popular", &[("page", page.to_string())])
                .await?;
            movies.extend(response.results.into_iter().map(Movie::from));
        }

        Ok(movies)
    }

    async fn fetch_by_query(&self, query: &str, page: u32) -> Result<SearchPage, UpstreamError> {
        debug!("TMDB movie search: query='{}', page={}", query, page);

        let response: TmdbListResponse = self
            .get_json(
                "search",
                "/search/movie",
                &[("query", query.to_string()), ("page", page.to_string())],
            )
            .await?;

        Ok(response.into())
    }

    async fn fetch_by_id(&self, id: u32) -> Result<Option<Movie>, UpstreamError> {
        debug!("TMDB get movie: id={}", id);

        match self
            .get_json::<TmdbMovieResult>("movie", &format!("/movie/{}", id), &[])
            .await
        {
            Ok(movie) => Ok(Some(movie.into())),
            Err(UpstreamError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// ============================================================================
// TMDB API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct TmdbErrorBody {
    status_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbListResponse {
    #[serde(default)]
    results: Vec<TmdbMovieResult>,
    total_pages: Option<u32>,
    total_results: Option<u32>,
}

/// List entry and details payload share this shape; TV entries use `name`.
#[derive(Debug, Deserialize)]
struct TmdbMovieResult {
    id: u32,
    #[serde(alias = "name")]
    title: Option<String>,
    #[serde(alias = "original_name")]
    original_title: Option<String>,
    #[serde(alias = "first_air_date")]
    release_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    vote_average: Option<f64>,
    vote_count: Option<u32>,
    popularity: Option<f64>,
    #[serde(default)]
    genre_ids: Vec<u32>,
    /// Present on the details endpoint instead of `genre_ids`.
    #[serde(default)]
    genres: Vec<TmdbGenre>,
    original_language: Option<String>,
    #[serde(default)]
    adult: bool,
    media_type: Option<String>,
    #[serde(default)]
    video: bool,
}

#[derive(Debug, Deserialize)]
struct TmdbGenre {
    id: u32,
}

// ============================================================================
// Conversions
// ============================================================================

impl From<TmdbMovieResult> for Movie {
    fn from(r: TmdbMovieResult) -> Self {
        let genre_ids = if r.genre_ids.is_empty() {
            r.genres.into_iter().map(|g| g.id).collect()
        } else {
            r.genre_ids
        };
        let title = r
            .title
            .or_else(|| r.original_title.clone())
            .unwrap_or_default();

        Self {
            id: r.id,
            title,
            overview: r.overview.filter(|o| !o.is_empty()),
            release_date: parse_release_date(r.release_date.as_deref()),
            poster_path: r.poster_path,
            backdrop_path: r.backdrop_path,
            vote_average: r.vote_average,
            vote_count: r.vote_count,
            popularity: r.popularity,
            genre_ids,
            original_language: r.original_language,
            original_title: r.original_title,
            adult: r.adult,
            media_type: r
                .media_type
                .as_deref()
                .and_then(MediaType::parse)
                .unwrap_or_default(),
            video: r.video,
        }
    }
}

impl From<TmdbListResponse> for SearchPage {
    fn from(r: TmdbListResponse) -> Self {
        Self {
            movies: r.results.into_iter().map(Movie::from).collect(),
            total_pages: r.total_pages.unwrap_or(1),
            total_results: r.total_results.unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve each canned `(status, body)` on its own connection and return the request heads.
    async fn stub_server(responses: Vec<(&'static str, String)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let mut heads = Vec::new();
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }
                heads.push(String::from_utf8_lossy(&buf).to_string());

                let reply = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
            heads
        });

        (format!("http://{}", addr), handle)
    }

    fn client(base_url: String) -> TmdbClient {
        TmdbClient::new(TmdbConfig {
            access_token: Some("token-123".to_string()),
            base_url: Some(base_url),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_requires_credentials() {
        assert!(matches!(
            TmdbClient::new(TmdbConfig::default()),
            Err(UpstreamError::NotConfigured(_))
        ));
        assert!(matches!(
            TmdbClient::new(TmdbConfig {
                api_key: Some("  ".to_string()),
                ..Default::default()
            }),
            Err(UpstreamError::NotConfigured(_))
        ));
        assert!(TmdbClient::new(TmdbConfig {
            api_key: Some("k".to_string()),
            ..Default::default()
        })
        .is_ok());
    }

    #[test]
    fn test_config_defaults() {
        let config: TmdbConfig = toml::from_str(r#"access_token = "abc""#).unwrap();
        assert_eq!(config.language, "pt-BR");
        assert_eq!(config.timeout_secs, 30);
        assert!(config.has_credentials());
        assert!(!TmdbConfig::default().has_credentials());
    }

    #[test]
    fn test_movie_result_conversion() {
        let result: TmdbMovieResult = serde_json::from_str(
            r#"{
                "id": 603,
                "title": "Matrix",
                "original_title": "The Matrix",
                "release_date": "1999-03-30",
                "overview": "",
                "poster_path": "/poster.jpg",
                "vote_average": 8.2,
                "vote_count": 25000,
                "popularity": 80.5,
                "genre_ids": [28, 878],
                "original_language": "en",
                "adult": false,
                "video": false
            }"#,
        )
        .unwrap();

        let movie: Movie = result.into();
        assert_eq!(movie.id, 603);
        assert_eq!(movie.title, "Matrix");
        assert_eq!(movie.original_title.as_deref(), Some("The Matrix"));
        assert_eq!(movie.release_date, NaiveDate::from_ymd_opt(1999, 3, 30));
        assert_eq!(movie.overview, None);
        assert_eq!(movie.genre_ids, vec![28, 878]);
        assert_eq!(movie.media_type, MediaType::Movie);
    }

    #[test]
    fn test_details_and_tv_conversion() {
        let details: TmdbMovieResult = serde_json::from_str(
            r#"{"id": 42, "title": "Details", "release_date": "", "genres": [{"id": 18, "name": "Drama"}]}"#,
        )
        .unwrap();
        let movie: Movie = details.into();
        assert_eq!(movie.genre_ids, vec![18]);
        assert_eq!(movie.release_date, None);

        let tv: TmdbMovieResult = serde_json::from_str(
            r#"{"id": 1399, "name": "Game of Thrones", "original_name": "GoT", "first_air_date": "2011-04-17", "media_type": "tv"}"#,
        )
        .unwrap();
        let show: Movie = tv.into();
        assert_eq!(show.title, "Game of Thrones");
        assert_eq!(show.media_type, MediaType::Tv);
        assert_eq!(show.release_date, NaiveDate::from_ymd_opt(2011, 4, 17));
    }

    #[test]
    fn test_search_page_defaults() {
        let response: TmdbListResponse = serde_json::from_str(r#"{"results": []}"#).unwrap();
        let page: SearchPage = response.into();
        assert!(page.is_empty());
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.total_results, 0);
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(r#"{"status_code": 7, "status_message": "Invalid API key"}"#, None),
            "Invalid API key"
        );
        assert_eq!(error_message("gateway down", Some("Bad Gateway")), "gateway down");
        assert_eq!(error_message("", Some("Bad Gateway")), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_search_sends_query_language_and_bearer() {
        let body = r#"{"page": 2, "results": [{"id": 268, "title": "Batman"}], "total_pages": 7, "total_results": 130}"#;
        let (base_url, server) = stub_server(vec![("200 OK", body.to_string())]).await;

        let page = client(base_url).fetch_by_query("batman begins", 2).await.unwrap();
        assert_eq!(page.movies.len(), 1);
        assert_eq!(page.movies[0].id, 268);
        assert_eq!(page.total_pages, 7);
        assert_eq!(page.total_results, 130);

        let heads = server.await.unwrap();
        let request_line = heads[0].lines().next().unwrap();
        assert!(request_line.starts_with("GET /search/movie?"));
        assert!(request_line.contains("language=pt-BR"));
        assert!(request_line.contains("query=batman+begins"));
        assert!(request_line.contains("page=2"));
        assert!(heads[0].to_lowercase().contains("authorization: bearer token-123"));
    }

    #[tokio::test]
    async fn test_fetch_by_id_404_is_none() {
        let (base_url, server) = stub_server(vec![(
            "404 Not Found",
            r#"{"status_code": 34, "status_message": "The resource you requested could not be found."}"#
                .to_string(),
        )])
        .await;

        let result = client(base_url).fetch_by_id(42).await.unwrap();
        assert!(result.is_none());

        let heads = server.await.unwrap();
        assert!(heads[0].starts_with("GET /movie/42?"));
    }

    #[tokio::test]
    async fn test_api_error_uses_status_message() {
        let (base_url, _server) = stub_server(vec![(
            "500 Internal Server Error",
            r#"{"status_message": "Internal error"}"#.to_string(),
        )])
        .await;

        match client(base_url).fetch_by_query("x", 1).await {
            Err(UpstreamError::Api { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "Internal error");
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let (base_url, _server) = stub_server(vec![(
            "429 Too Many Requests",
            r#"{"status_message": "Request count is over the allowed limit."}"#.to_string(),
        )])
        .await;

        match client(base_url).fetch_by_id(1).await {
            Err(err @ UpstreamError::RateLimited(_)) => {
                assert_eq!(err.status(), Some(429));
                assert!(err.to_string().contains("over the allowed limit"));
            }
            other => panic!("expected rate limit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejected_credentials_keep_status_and_message() {
        let (base_url, _server) = stub_server(vec![(
            "401 Unauthorized",
            r#"{"status_code": 7, "status_message": "Invalid API key: You must be granted a valid key."}"#
                .to_string(),
        )])
        .await;

        match client(base_url).fetch_by_query("dune", 1).await {
            Err(UpstreamError::Api { status, message }) => {
                assert_eq!(status, 401);
                assert!(message.starts_with("Invalid API key"));
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_popular_fails_whole_when_a_later_page_fails() {
        let (base_url, server) = stub_server(vec![
            ("200 OK", r#"{"results": [{"id": 1, "title": "One"}]}"#.to_string()),
            (
                "500 Internal Server Error",
                r#"{"status_message": "Internal error"}"#.to_string(),
            ),
        ])
        .await;

        match client(base_url).fetch_popular(2).await {
            Err(UpstreamError::Api { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "Internal error");
            }
            other => panic!("expected API error, got {:?}", other),
        }

        let heads = server.await.unwrap();
        assert_eq!(heads.len(), 2);
    }

    #[tokio::test]
    async fn test_popular_fetches_pages_in_order() {
        let (base_url, server) = stub_server(vec![
            ("200 OK", r#"{"results": [{"id": 1, "title": "One"}, {"id": 2, "title": "Two"}]}"#.to_string()),
            ("200 OK", r#"{"results": [{"id": 3, "title": "Three"}]}"#.to_string()),
        ])
        .await;

        let movies = client(base_url).fetch_popular(2).await.unwrap();
        let ids: Vec<u32> = movies.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let heads = server.await.unwrap();
        assert!(heads[0].lines().next().unwrap().contains("page=1"));
        assert!(heads[1].lines().next().unwrap().contains("page=2"));
    }

    #[tokio::test]
    async fn test_api_key_sent_as_query() {
        let (base_url, server) =
            stub_server(vec![("200 OK", r#"{"id": 7, "title": "Se7en"}"#.to_string())]).await;
        let client = TmdbClient::new(TmdbConfig {
            api_key: Some("v3key".to_string()),
            base_url: Some(base_url),
            ..Default::default()
        })
        .unwrap();

        let movie = client.fetch_by_id(7).await.unwrap().unwrap();
        assert_eq!(movie.title, "Se7en");

        let heads = server.await.unwrap();
        assert!(heads[0].lines().next().unwrap().contains("api_key=v3key"));
    }
}
