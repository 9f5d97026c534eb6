//! Common test utilities for end-to-end testing with a mocked upstream.
//!
//! The fixture runs the full router in-process against a SQLite database in a
//! temporary directory, with [`MockMovieSource`] standing in for TMDB.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use cinecache_core::testing::MockMovieSource;
use cinecache_core::{AuthConfig, CatalogService, Config, Movie, MovieStore, SqliteStore};
use cinecache_server::{create_router, AppState};

/// Re-export fixtures for test convenience
pub use cinecache_core::testing::fixtures;

/// Test fixture for end-to-end testing.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_lookup() {
///     let fixture = TestFixture::new().await;
///     fixture.source.add_movie(fixtures::movie(603, "The Matrix")).await;
///
///     let response = fixture.get("/api/v1/movies/603").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock upstream - configure TMDB responses
    pub source: Arc<MockMovieSource>,
    /// Direct handle on the database behind the router
    pub store: Arc<SqliteStore>,
    /// Temporary directory holding the database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    /// Parsed JSON body, `Null` when empty or not JSON
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    /// Create a new test fixture with an open API.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let store = Arc::new(SqliteStore::new(&db_path).expect("Failed to create store"));
        let source = Arc::new(MockMovieSource::new());

        let config = Config {
            auth: AuthConfig {
                api_key: test_config.api_key,
            },
            ..Default::default()
        };

        let catalog = CatalogService::new(store.clone(), store.clone(), source.clone());
        let state = Arc::new(AppState::new(config, catalog));
        let router = create_router(state);

        Self {
            router,
            source,
            store,
            temp_dir,
        }
    }

    /// Write movies straight into the store, bypassing the API.
    pub fn seed(&self, movies: &[Movie]) {
        for movie in movies {
            self.store.upsert(movie).expect("Failed to seed movie");
        }
    }

    /// Send a GET request.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, &[]).await
    }

    /// Send a GET request with extra headers.
    pub async fn get_with_headers(&self, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        self.request("GET", path, None, headers).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), &[]).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            request_builder = request_builder.header(*name, *value);
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).to_string();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Require this API key on movie routes
    pub api_key: Option<String>,
}

impl TestConfig {
    pub fn with_api_key(key: &str) -> Self {
        Self {
            api_key: Some(key.to_string()),
        }
    }
}

/// Assert that a response has the expected status code.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {}, got {}. Body: {:?}",
            $status, $response.status, $response.body
        );
    };
}
