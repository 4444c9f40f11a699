//! Catalog service: books and categories

use validator::Validate;

use super::{Store, WriteGate};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{CreateBook, CreateCategory, UpdateBook, UpdateCategory},
        Book, Category,
    },
};

#[derive(Clone)]
pub struct CatalogService {
    store: Store,
    gate: WriteGate,
}

impl CatalogService {
    pub fn new(store: Store, gate: WriteGate) -> Self {
        Self { store, gate }
    }

    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.store.list_all_books().await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.store
            .get_book_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Books with more than one copy on hand
    pub async fn available_books(&self) -> AppResult<Vec<Book>> {
        Ok(self
            .store
            .list_all_books()
            .await?
            .into_iter()
            .filter(|b| b.amount > 1)
            .collect())
    }

    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        book.validate()?;
        check_prices(&[book.sell_price.unwrap_or_default()])?;
        self.get_category(book.category_id).await?;
        let created = self.store.create_book(&book).await?;
        tracing::info!(book_id = created.id, name = %created.name, "Book created");
        Ok(created)
    }

    /// Apply the fields present in `update`
    pub async fn update_book(&self, id: i32, update: UpdateBook) -> AppResult<Book> {
        update.validate()?;
        check_prices(&[update.sell_price.unwrap_or_default()])?;
        let _gate = self.gate.enter().await;

        let mut book = self.get_book(id).await?;
        if let Some(category_id) = update.category_id {
            self.get_category(category_id).await?;
            book.category_id = category_id;
        }
        if let Some(name) = update.name {
            book.name = name;
        }
        if let Some(serial_number) = update.serial_number {
            book.serial_number = serial_number;
        }
        if let Some(amount) = update.amount {
            book.amount = amount;
        }
        if update.sell_price.is_some() {
            book.sell_price = update.sell_price;
        }

        self.store.update_book(&book).await?;
        Ok(book)
    }

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.store.list_all_categories().await
    }

    pub async fn get_category(&self, id: i32) -> AppResult<Category> {
        self.store
            .get_category_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category with id {} not found", id)))
    }

    pub async fn create_category(&self, category: CreateCategory) -> AppResult<Category> {
        category.validate()?;
        check_prices(&[category.rent_price, category.overdue_penalty])?;
        let created = self.store.create_category(&category).await?;
        tracing::info!(category_id = created.id, name = %created.name, "Category created");
        Ok(created)
    }

    /// Apply the fields present in `update`
    pub async fn update_category(&self, id: i32, update: UpdateCategory) -> AppResult<Category> {
        update.validate()?;
        let _gate = self.gate.enter().await;

        let mut category = self.get_category(id).await?;
        if let Some(name) = update.name {
            category.name = name;
        }
        if let Some(limit) = update.limit {
            category.limit = limit;
        }
        if let Some(rent_price) = update.rent_price {
            category.rent_price = rent_price;
        }
        if let Some(overdue_penalty) = update.overdue_penalty {
            category.overdue_penalty = overdue_penalty;
        }
        check_prices(&[category.rent_price, category.overdue_penalty])?;

        self.store.update_category(&category).await?;
        Ok(category)
    }
}

fn check_prices(prices: &[rust_decimal::Decimal]) -> AppResult<()> {
    if prices.iter().any(|p| p.is_sign_negative()) {
        return Err(AppError::Validation("Prices cannot be negative".to_string()));
    }
    Ok(())
}
