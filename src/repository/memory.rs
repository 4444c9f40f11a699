//! In-process store
//!
//! Keeps every table in ordered maps behind one lock. Used by the test
//! suites and by embedders that do not need durable storage.

use std::collections::BTreeMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{CreateBook, CreateCategory},
        Book, Category, LoanRecord, LoanStatus, NewLoan, User,
    },
};

use super::LibraryStore;

#[derive(Default)]
struct Tables {
    books: BTreeMap<i32, Book>,
    categories: BTreeMap<i32, Category>,
    users: BTreeMap<i32, User>,
    loans: BTreeMap<i32, LoanRecord>,
    next_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    /// Keep generated ids ahead of ids inserted by hand
    fn observe_id(&mut self, id: i32) {
        self.next_id = self.next_id.max(id);
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) {
        let mut tables = self.tables.write().await;
        tables.observe_id(user.id);
        tables.users.insert(user.id, user);
    }

    pub async fn insert_book(&self, book: Book) {
        let mut tables = self.tables.write().await;
        tables.observe_id(book.id);
        tables.books.insert(book.id, book);
    }

    pub async fn insert_category(&self, category: Category) {
        let mut tables = self.tables.write().await;
        tables.observe_id(category.id);
        tables.categories.insert(category.id, category);
    }

    /// Store a loan row verbatim, malformed or not
    pub async fn insert_loan_record(&self, loan: LoanRecord) {
        let mut tables = self.tables.write().await;
        tables.observe_id(loan.id);
        tables.loans.insert(loan.id, loan);
    }

    fn filter_loans(tables: &Tables, keep: impl Fn(&LoanRecord) -> bool) -> Vec<LoanRecord> {
        tables.loans.values().filter(|l| keep(l)).cloned().collect()
    }
}

#[async_trait]
impl LibraryStore for MemoryStore {
    async fn get_book_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        Ok(self.tables.read().await.books.get(&id).cloned())
    }

    async fn get_category_by_id(&self, id: i32) -> AppResult<Option<Category>> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn get_user_by_id(&self, id: i32) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_loan_by_id(&self, id: i32) -> AppResult<Option<LoanRecord>> {
        Ok(self.tables.read().await.loans.get(&id).cloned())
    }

    async fn list_loans_by_user(&self, user_id: i32) -> AppResult<Vec<LoanRecord>> {
        let tables = self.tables.read().await;
        Ok(Self::filter_loans(&tables, |l| l.user_id == user_id))
    }

    async fn list_loans_by_book(&self, book_id: i32) -> AppResult<Vec<LoanRecord>> {
        let tables = self.tables.read().await;
        Ok(Self::filter_loans(&tables, |l| l.book_id == book_id))
    }

    async fn list_all_loans(&self) -> AppResult<Vec<LoanRecord>> {
        let tables = self.tables.read().await;
        Ok(Self::filter_loans(&tables, |_| true))
    }

    async fn list_unresolved_loans(&self) -> AppResult<Vec<LoanRecord>> {
        let resolved = [
            i16::from(LoanStatus::Received),
            i16::from(LoanStatus::OverdueDelivered),
            i16::from(LoanStatus::Sold),
        ];
        let tables = self.tables.read().await;
        Ok(Self::filter_loans(&tables, |l| !resolved.contains(&l.status)))
    }

    async fn list_all_books(&self) -> AppResult<Vec<Book>> {
        Ok(self.tables.read().await.books.values().cloned().collect())
    }

    async fn list_all_categories(&self) -> AppResult<Vec<Category>> {
        Ok(self.tables.read().await.categories.values().cloned().collect())
    }

    async fn create_book(&self, book: &CreateBook) -> AppResult<Book> {
        let mut tables = self.tables.write().await;
        let created = Book {
            id: tables.next_id(),
            name: book.name.clone(),
            category_id: book.category_id,
            serial_number: book.serial_number.clone(),
            amount: book.amount,
            sell_price: book.sell_price,
        };
        tables.books.insert(created.id, created.clone());
        Ok(created)
    }

    async fn create_category(&self, category: &CreateCategory) -> AppResult<Category> {
        let mut tables = self.tables.write().await;
        let created = Category {
            id: tables.next_id(),
            name: category.name.clone(),
            limit: category.limit,
            rent_price: category.rent_price,
            overdue_penalty: category.overdue_penalty,
        };
        tables.categories.insert(created.id, created.clone());
        Ok(created)
    }

    async fn create_loan(&self, loan: &NewLoan) -> AppResult<LoanRecord> {
        let mut tables = self.tables.write().await;
        let record = loan.clone().into_record(tables.next_id());
        tables.loans.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_book(&self, book: &Book) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .books
            .get_mut(&book.id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book.id)))?;
        *slot = book.clone();
        Ok(())
    }

    async fn update_category(&self, category: &Category) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let slot = tables.categories.get_mut(&category.id).ok_or_else(|| {
            AppError::NotFound(format!("Category with id {} not found", category.id))
        })?;
        *slot = category.clone();
        Ok(())
    }

    async fn update_loan(&self, loan: &LoanRecord) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .loans
            .get_mut(&loan.id)
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan.id)))?;
        *slot = loan.clone();
        Ok(())
    }

    async fn update_user_balance(&self, user_id: i32, balance: Decimal) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user_id)))?;
        user.balance = balance;
        Ok(())
    }

    async fn delete_loan(&self, id: i32) -> AppResult<()> {
        self.tables.write().await.loans.remove(&id);
        Ok(())
    }

    async fn reserve_copy(&self, book_id: i32) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let book = tables
            .books
            .get_mut(&book_id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;
        if book.amount <= 0 {
            return Ok(false);
        }
        book.amount -= 1;
        Ok(true)
    }

    async fn release_copy(&self, book_id: i32) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let book = tables
            .books
            .get_mut(&book_id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;
        book.amount += 1;
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
