//! OpenAPI documentation

use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

use crate::{
    api::{books, health, loans, stats},
    error::ErrorResponse,
    models::{
        book::{CreateBook, CreateCategory, UpdateBook, UpdateCategory},
        loan::LoanRequest,
        stats::BucketSummary,
        Book, Category, Loan, LoanStatus, StatisticsReport, ViolationEntry,
    },
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bookkeep API",
        version = "0.1.0",
        description = "Library lending, sales and billing REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Catalog
        books::list_books,
        books::available_books,
        books::create_book,
        books::update_book,
        books::list_categories,
        books::create_category,
        books::update_category,
        // Loans
        loans::create_loan,
        loans::return_loan,
        loans::create_sale,
        loans::get_user_loans,
        loans::get_user_books,
        // Stats
        stats::get_stats,
        stats::get_violations,
    ),
    components(schemas(
        health::HealthResponse,
        loans::LoanResponse,
        loans::ReturnResponse,
        loans::SaleResponse,
        ErrorResponse,
        Book,
        Category,
        CreateBook,
        UpdateBook,
        CreateCategory,
        UpdateCategory,
        Loan,
        LoanStatus,
        LoanRequest,
        StatisticsReport,
        BucketSummary,
        ViolationEntry,
    )),
    tags(
        (name = "health", description = "Service health"),
        (name = "catalog", description = "Books and categories"),
        (name = "loans", description = "Borrowing, returns and sales"),
        (name = "stats", description = "Statistics and overdue ranking")
    )
)]
pub struct ApiDoc;

/// Router serving the OpenAPI document
pub fn create_openapi_router() -> Router {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}
