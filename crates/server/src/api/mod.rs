pub mod error;
pub mod handlers;
pub mod middleware;
pub mod movies;
pub mod routes;
pub mod validation;

pub use routes::create_router;
