//! Persistence layer
//!
//! The lending engine only talks to [`LibraryStore`]. [`Repository`] backs it
//! with PostgreSQL; [`memory::MemoryStore`] keeps everything in process.

pub mod books;
pub mod categories;
pub mod loans;
pub mod memory;
pub mod users;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        book::{CreateBook, CreateCategory},
        Book, Category, LoanRecord, NewLoan, User,
    },
};

/// Persistence contract consumed by the services.
///
/// Lookups return `Ok(None)` when the entity does not exist. Loans cross this
/// boundary in their persisted shape and are decoded by the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LibraryStore: Send + Sync {
    async fn get_book_by_id(&self, id: i32) -> AppResult<Option<Book>>;
    async fn get_category_by_id(&self, id: i32) -> AppResult<Option<Category>>;
    async fn get_user_by_id(&self, id: i32) -> AppResult<Option<User>>;
    async fn get_loan_by_id(&self, id: i32) -> AppResult<Option<LoanRecord>>;

    async fn list_loans_by_user(&self, user_id: i32) -> AppResult<Vec<LoanRecord>>;
    async fn list_loans_by_book(&self, book_id: i32) -> AppResult<Vec<LoanRecord>>;
    async fn list_all_loans(&self) -> AppResult<Vec<LoanRecord>>;
    /// Loans whose status is neither received, overdue delivered nor sold
    async fn list_unresolved_loans(&self) -> AppResult<Vec<LoanRecord>>;
    async fn list_all_books(&self) -> AppResult<Vec<Book>>;
    async fn list_all_categories(&self) -> AppResult<Vec<Category>>;

    async fn create_book(&self, book: &CreateBook) -> AppResult<Book>;
    async fn create_category(&self, category: &CreateCategory) -> AppResult<Category>;
    async fn create_loan(&self, loan: &NewLoan) -> AppResult<LoanRecord>;

    async fn update_book(&self, book: &Book) -> AppResult<()>;
    async fn update_category(&self, category: &Category) -> AppResult<()>;
    async fn update_loan(&self, loan: &LoanRecord) -> AppResult<()>;
    async fn update_user_balance(&self, user_id: i32, balance: Decimal) -> AppResult<()>;
    async fn delete_loan(&self, id: i32) -> AppResult<()>;

    /// Take one copy off the shelf. Returns `false` without writing when none is left.
    async fn reserve_copy(&self, book_id: i32) -> AppResult<bool>;
    /// Put one copy back on the shelf
    async fn release_copy(&self, book_id: i32) -> AppResult<()>;

    /// Round trip to the backing storage
    async fn ping(&self) -> AppResult<()>;
}

/// PostgreSQL-backed store holding one repository per table
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
    pub categories: categories::CategoriesRepository,
    pub users: users::UsersRepository,
    pub loans: loans::LoansRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            categories: categories::CategoriesRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl LibraryStore for Repository {
    async fn get_book_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        self.books.get_by_id(id).await
    }

    async fn get_category_by_id(&self, id: i32) -> AppResult<Option<Category>> {
        self.categories.get_by_id(id).await
    }

    async fn get_user_by_id(&self, id: i32) -> AppResult<Option<User>> {
        self.users.get_by_id(id).await
    }

    async fn get_loan_by_id(&self, id: i32) -> AppResult<Option<LoanRecord>> {
        self.loans.get_by_id(id).await
    }

    async fn list_loans_by_user(&self, user_id: i32) -> AppResult<Vec<LoanRecord>> {
        self.loans.list_by_user(user_id).await
    }

    async fn list_loans_by_book(&self, book_id: i32) -> AppResult<Vec<LoanRecord>> {
        self.loans.list_by_book(book_id).await
    }

    async fn list_all_loans(&self) -> AppResult<Vec<LoanRecord>> {
        self.loans.list_all().await
    }

    async fn list_unresolved_loans(&self) -> AppResult<Vec<LoanRecord>> {
        self.loans.list_unresolved().await
    }

    async fn list_all_books(&self) -> AppResult<Vec<Book>> {
        self.books.list_all().await
    }

    async fn list_all_categories(&self) -> AppResult<Vec<Category>> {
        self.categories.list_all().await
    }

    async fn create_book(&self, book: &CreateBook) -> AppResult<Book> {
        self.books.create(book).await
    }

    async fn create_category(&self, category: &CreateCategory) -> AppResult<Category> {
        self.categories.create(category).await
    }

    async fn create_loan(&self, loan: &NewLoan) -> AppResult<LoanRecord> {
        self.loans.create(loan).await
    }

    async fn update_book(&self, book: &Book) -> AppResult<()> {
        self.books.update(book).await
    }

    async fn update_category(&self, category: &Category) -> AppResult<()> {
        self.categories.update(category).await
    }

    async fn update_loan(&self, loan: &LoanRecord) -> AppResult<()> {
        self.loans.update(loan).await
    }

    async fn update_user_balance(&self, user_id: i32, balance: Decimal) -> AppResult<()> {
        self.users.update_balance(user_id, balance).await
    }

    async fn delete_loan(&self, id: i32) -> AppResult<()> {
        self.loans.delete(id).await
    }

    async fn reserve_copy(&self, book_id: i32) -> AppResult<bool> {
        self.books.decrement_amount(book_id).await
    }

    async fn release_copy(&self, book_id: i32) -> AppResult<()> {
        self.books.increment_amount(book_id).await
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
