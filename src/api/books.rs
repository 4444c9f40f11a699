//! Catalog endpoints: books and categories

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        book::{CreateBook, CreateCategory, UpdateBook, UpdateCategory},
        Book, Category,
    },
};

/// List all books
#[utoipa::path(
    get,
    path = "/books",
    tag = "catalog",
    responses(
        (status = 200, description = "All books", body = Vec<Book>)
    )
)]
pub async fn list_books(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Book>>> {
    Ok(Json(state.services.catalog.list_books().await?))
}

/// List books with more than one copy on hand
#[utoipa::path(
    get,
    path = "/books/available",
    tag = "catalog",
    responses(
        (status = 200, description = "Available books", body = Vec<Book>)
    )
)]
pub async fn available_books(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Book>>> {
    Ok(Json(state.services.catalog.available_books().await?))
}

/// Create a book
#[utoipa::path(
    post,
    path = "/books",
    tag = "catalog",
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid book"),
        (status = 404, description = "Category not found")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    Json(book): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let created = state.services.catalog.create_book(book).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a book
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "catalog",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(update): Json<UpdateBook>,
) -> AppResult<Json<Book>> {
    Ok(Json(state.services.catalog.update_book(id, update).await?))
}

/// List all categories
#[utoipa::path(
    get,
    path = "/categories",
    tag = "catalog",
    responses(
        (status = 200, description = "All categories", body = Vec<Category>)
    )
)]
pub async fn list_categories(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(state.services.catalog.list_categories().await?))
}

/// Create a category
#[utoipa::path(
    post,
    path = "/categories",
    tag = "catalog",
    request_body = CreateCategory,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 400, description = "Invalid category")
    )
)]
pub async fn create_category(
    State(state): State<crate::AppState>,
    Json(category): Json<CreateCategory>,
) -> AppResult<(StatusCode, Json<Category>)> {
    let created = state.services.catalog.create_category(category).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a category
#[utoipa::path(
    put,
    path = "/categories/{id}",
    tag = "catalog",
    params(
        ("id" = i32, Path, description = "Category ID")
    ),
    request_body = UpdateCategory,
    responses(
        (status = 200, description = "Category updated", body = Category),
        (status = 404, description = "Category not found")
    )
)]
pub async fn update_category(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(update): Json<UpdateCategory>,
) -> AppResult<Json<Category>> {
    Ok(Json(state.services.catalog.update_category(id, update).await?))
}
