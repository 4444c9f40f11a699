//! API handlers for Bookkeep REST endpoints

pub mod books;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod stats;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Catalog
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/available", get(books::available_books))
        .route("/books/:id", put(books::update_book))
        .route("/categories", get(books::list_categories).post(books::create_category))
        .route("/categories/:id", put(books::update_category))
        // Lending
        .route("/loans", post(loans::create_loan))
        .route("/loans/:id/return", post(loans::return_loan))
        .route("/sales", post(loans::create_sale))
        .route("/users/:id/loans", get(loans::get_user_loans))
        .route("/users/:id/books", get(loans::get_user_books))
        // Statistics
        .route("/stats", get(stats::get_stats))
        .route("/stats/violations", get(stats::get_violations))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
