use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{handlers, middleware::auth_middleware, middleware::metrics_middleware, movies};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Movie routes require the API key when one is configured
    let movie_routes = Router::new()
        .route("/movies/suggestions", get(movies::suggestions))
        .route(
            "/movies",
            get(movies::list_movies).post(movies::filter_movies),
        )
        .route("/movies/search", get(movies::search_movies))
        .route("/movies/update", post(movies::refresh_popular))
        .route("/movies/{id}", get(movies::get_movie))
        .route("/config", get(handlers::get_config))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .merge(movie_routes);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
