use std::sync::Arc;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use crate::features::categories::handlers;
use crate::features::categories::services::CategoryService;

/// Create routes for the categories feature
pub fn routes(service: Arc<CategoryService>) -> Router {
    Router::new()
        .route("/api/categories", get(handlers::list_categories))
        .route("/api/categories", post(handlers::create_category))
        .route("/api/categories/tree", get(handlers::get_category_tree))
        .route(
            "/api/categories/slug/{slug}",
            get(handlers::get_category_by_slug),
        )
        .route("/api/categories/{id}", get(handlers::get_category_by_id))
        .route("/api/categories/{id}", patch(handlers::update_category))
        .route("/api/categories/{id}", delete(handlers::delete_category))
        .route(
            "/api/categories/{id}/courses",
            get(handlers::list_category_courses),
        )
        .with_state(service)
}
