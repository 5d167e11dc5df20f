use crate::handlers;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/telegram/webhook", post(handlers::telegram_webhook))
        .route("/api/v1/tests", post(handlers::start_test))
        .route("/api/v1/answers", post(handlers::submit_answer))
        .route("/api/v1/subjects", get(handlers::list_subjects))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
