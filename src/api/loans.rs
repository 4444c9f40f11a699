//! Lending endpoints: borrow, return, sell

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        book::UserBooksFilter,
        loan::{LoanRequest, ReturnOutcome},
        Book, Loan,
    },
};

/// Loan response
#[derive(Serialize, ToSchema)]
pub struct LoanResponse {
    /// Status message
    pub message: String,
    pub loan: Loan,
}

/// Return response
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    /// "returned" or "already_delivered"
    pub status: String,
    pub message: String,
    /// Updated loan, absent when nothing changed
    pub loan: Option<Loan>,
}

/// Sale response
#[derive(Serialize, ToSchema)]
pub struct SaleResponse {
    pub message: String,
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = LoanRequest,
    responses(
        (status = 201, description = "Loan created", body = LoanResponse),
        (status = 400, description = "Rejected by a lending rule", body = crate::error::ErrorResponse),
        (status = 404, description = "User or book not found")
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    Json(request): Json<LoanRequest>,
) -> AppResult<(StatusCode, Json<LoanResponse>)> {
    request.validate()?;

    let loan = state
        .services
        .lending
        .borrow(request.user_id, request.book_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LoanResponse {
            message: "Book borrowed successfully".to_string(),
            loan,
        }),
    ))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Book returned, or already delivered", body = ReturnResponse),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<ReturnResponse>> {
    let response = match state.services.lending.return_loan(loan_id).await? {
        ReturnOutcome::Delivered { message, loan } => ReturnResponse {
            status: "returned".to_string(),
            message,
            loan: Some(loan),
        },
        ReturnOutcome::AlreadyDelivered { message } => ReturnResponse {
            status: "already_delivered".to_string(),
            message,
            loan: None,
        },
    };
    Ok(Json(response))
}

/// Sell a book
#[utoipa::path(
    post,
    path = "/sales",
    tag = "loans",
    request_body = LoanRequest,
    responses(
        (status = 201, description = "Book sold", body = SaleResponse),
        (status = 400, description = "Rejected by a sale rule", body = crate::error::ErrorResponse),
        (status = 404, description = "User or book not found")
    )
)]
pub async fn create_sale(
    State(state): State<crate::AppState>,
    Json(request): Json<LoanRequest>,
) -> AppResult<(StatusCode, Json<SaleResponse>)> {
    request.validate()?;

    let message = state
        .services
        .lending
        .sell(request.user_id, request.book_id)
        .await?;

    Ok((StatusCode::CREATED, Json(SaleResponse { message })))
}

/// Get every loan record of a user
#[utoipa::path(
    get,
    path = "/users/{id}/loans",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User's loans", body = Vec<Loan>),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_loans(
    State(state): State<crate::AppState>,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<Loan>>> {
    let loans = state.services.lending.user_loans(user_id).await?;
    Ok(Json(loans))
}

/// Get the books a user has had loans on
#[utoipa::path(
    get,
    path = "/users/{id}/books",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "User ID"),
        UserBooksFilter
    ),
    responses(
        (status = 200, description = "Matching books", body = Vec<Book>),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_books(
    State(state): State<crate::AppState>,
    Path(user_id): Path<i32>,
    Query(filter): Query<UserBooksFilter>,
) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.lending.find_user_books(user_id, &filter).await?;
    Ok(Json(books))
}
