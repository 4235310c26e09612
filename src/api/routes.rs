use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Sessions
        .route("/session", post(handlers::create_session))
        .route("/session/:id", get(handlers::get_session))
        .route("/session/:id", put(handlers::update_session))
        .route("/session/:id", delete(handlers::delete_session))
        // Catalog
        .route("/item/:article_id", get(handlers::get_item))
        // Query item and recommendations
        .route(
            "/session/:id/query-item/:article_id",
            post(handlers::set_query_item),
        )
        .route("/session/:id/query-item", get(handlers::get_query_item))
        .route(
            "/session/:id/recommendations",
            get(handlers::get_recommendations),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
