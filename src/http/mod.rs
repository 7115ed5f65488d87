use axum::Router;

use crate::AppState;

mod error;
mod handlers;
mod middleware;
mod routes;

pub use error::AppError;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health())
        .merge(routes::api())
        .merge(routes::viewer())
        .with_state(state)
}
