//! Books repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, CreateBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    /// List all books
    pub async fn list_all(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    /// Create a new book
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (name, category_id, serial_number, amount, sell_price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&book.name)
        .bind(book.category_id)
        .bind(&book.serial_number)
        .bind(book.amount)
        .bind(book.sell_price)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// Overwrite every column of a book
    pub async fn update(&self, book: &Book) -> AppResult<()> {
        let rows = sqlx::query(
            r#"
            UPDATE books
            SET name = $2, category_id = $3, serial_number = $4, amount = $5, sell_price = $6
            WHERE id = $1
            "#,
        )
        .bind(book.id)
        .bind(&book.name)
        .bind(book.category_id)
        .bind(&book.serial_number)
        .bind(book.amount)
        .bind(book.sell_price)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", book.id)));
        }
        Ok(())
    }

    /// Decrement the copy count if at least one copy is left.
    /// The condition is evaluated by the database, so concurrent callers
    /// can never push the amount below zero.
    pub async fn decrement_amount(&self, id: i32) -> AppResult<bool> {
        let rows = sqlx::query("UPDATE books SET amount = amount - 1 WHERE id = $1 AND amount > 0")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows == 1)
    }

    /// Increment the copy count
    pub async fn increment_amount(&self, id: i32) -> AppResult<()> {
        let rows = sqlx::query("UPDATE books SET amount = amount + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }
}
