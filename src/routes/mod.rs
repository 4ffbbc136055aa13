pub mod health;
pub mod items;
pub mod queue;
pub mod reviews;
pub mod scheduler;

use axum::extract::DefaultBodyLimit;
use axum::Router;

use crate::constants::MAX_BODY_SIZE;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .nest("/reviews", reviews::router())
        .nest("/queue", queue::router())
        .nest("/items", items::router())
        .nest("/scheduler", scheduler::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE));

    Router::new()
        .nest("/api", api_routes)
        .nest("/health", health::router())
        .with_state(state)
}
