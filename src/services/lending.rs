//! Lending and selling: the loan lifecycle from borrow to return, and sales

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::{
    decode_loans, eligibility::EligibilityEvaluator, inventory::InventoryLedger,
    rent_duration::RentDurationCalculator, Store, WriteGate,
};
use crate::{
    config::LendingConfig,
    error::{AppError, AppResult, LendingRejection},
    models::{
        book::UserBooksFilter,
        loan::SALE_SENTINEL_DAYS,
        Book, Category, Loan, LoanRecord, LoanStatus, NewLoan, ReturnOutcome, User,
    },
};

const ALREADY_DELIVERED: &str = "Book already been delivered";

#[derive(Clone)]
pub struct LendingService {
    store: Store,
    gate: WriteGate,
    config: LendingConfig,
    eligibility: EligibilityEvaluator,
    rent: RentDurationCalculator,
    inventory: InventoryLedger,
}

impl LendingService {
    pub fn new(store: Store, gate: WriteGate, config: LendingConfig) -> Self {
        Self {
            eligibility: EligibilityEvaluator::new(store.clone()),
            rent: RentDurationCalculator::new(store.clone(), config.clone()),
            inventory: InventoryLedger::new(store.clone()),
            store,
            gate,
            config,
        }
    }

    /// Borrow a book
    pub async fn borrow(&self, user_id: i32, book_id: i32) -> AppResult<Loan> {
        self.borrow_at(user_id, book_id, Utc::now()).await
    }

    /// Borrow a book at the given instant.
    ///
    /// Rejections, in evaluation order: overdue lock, category limit, out of
    /// capacity, insufficient balance (less than `multiplier * rent_price`).
    pub async fn borrow_at(&self, user_id: i32, book_id: i32, now: DateTime<Utc>) -> AppResult<Loan> {
        let _gate = self.gate.enter().await;

        let user = self.user(user_id).await?;
        let book = self.book(book_id).await?;
        let category = self.category(book.category_id).await?;

        self.eligibility.check(&user, &book, &category).await?;

        let days = self.rent.valid_rent_days(&book, now).await?;
        if days == 0 {
            return Err(LendingRejection::OutOfCapacity.into());
        }

        let required = self.config.borrow_balance_multiplier * category.rent_price;
        if user.balance < required {
            return Err(LendingRejection::InsufficientBalance {
                balance: user.balance,
                required,
            }
            .into());
        }

        if !self.inventory.reserve(book.id).await? {
            return Err(LendingRejection::OutOfCapacity.into());
        }

        let new_loan = NewLoan {
            book_id: book.id,
            user_id: user.id,
            taken_date: now,
            returning_date: None,
            valid_borrowed_days: days,
            bill: Decimal::ZERO,
            status: LoanStatus::Taken,
        };
        let record = match self.store.create_loan(&new_loan).await {
            Ok(record) => record,
            Err(e) => {
                self.inventory.release_after_failure(book.id).await;
                return Err(e);
            }
        };

        tracing::info!(
            loan_id = record.id,
            user_id,
            book_id,
            valid_borrowed_days = days,
            "Book borrowed"
        );
        Loan::try_from(record)
    }

    /// Return a borrowed book
    pub async fn return_loan(&self, loan_id: i32) -> AppResult<ReturnOutcome> {
        self.return_loan_at(loan_id, Utc::now()).await
    }

    /// Return a borrowed book at the given instant.
    ///
    /// Within the valid borrowed days the loan becomes received; later it
    /// becomes overdue delivered and the category penalty is added to the
    /// bill and taken from the user's balance. Either way one copy goes back
    /// to the shelf. A loan that is already resolved is left untouched.
    pub async fn return_loan_at(&self, loan_id: i32, now: DateTime<Utc>) -> AppResult<ReturnOutcome> {
        let _gate = self.gate.enter().await;

        let record = self
            .store
            .get_loan_by_id(loan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;
        let mut loan = Loan::try_from(record)?;

        if loan.status.is_terminal() {
            tracing::info!(loan_id, status = %loan.status, "Return on a resolved loan ignored");
            return Ok(ReturnOutcome::AlreadyDelivered {
                message: ALREADY_DELIVERED.to_string(),
            });
        }

        let (book, category, user) = self.loan_parties(&loan).await?;

        let previous = loan.clone();
        let elapsed = loan.elapsed(now);
        let late = loan.is_past_due(now);
        let mut message = "Book delivered successfully.".to_string();

        loan.returning_date = Some(now);
        if late {
            loan.transition_to(LoanStatus::OverdueDelivered)?;
            loan.charge(category.overdue_penalty)?;
            message.push_str(&format!(
                "\nOverdue delivery ({} days), user received a penalty of {}",
                elapsed.num_days(),
                category.overdue_penalty
            ));
        } else {
            loan.transition_to(LoanStatus::Received)?;
        }

        self.store.update_loan(&LoanRecord::from(&loan)).await?;

        if late {
            if let Err(e) = self
                .store
                .update_user_balance(user.id, user.balance - category.overdue_penalty)
                .await
            {
                self.restore_loan(&previous).await;
                return Err(e);
            }
        }

        if let Err(e) = self.inventory.release(book.id).await {
            if late {
                self.restore_balance(&user).await;
            }
            self.restore_loan(&previous).await;
            return Err(e);
        }

        tracing::info!(
            loan_id,
            user_id = user.id,
            book_id = book.id,
            status = %loan.status,
            bill = %loan.bill,
            "Book returned"
        );
        Ok(ReturnOutcome::Delivered { message, loan })
    }

    /// Sell a book
    pub async fn sell(&self, user_id: i32, book_id: i32) -> AppResult<String> {
        self.sell_at(user_id, book_id, Utc::now()).await
    }

    /// Sell a book at the given instant.
    ///
    /// The balance must be strictly greater than the price. The sale is
    /// recorded as a loan created directly in the sold status.
    pub async fn sell_at(&self, user_id: i32, book_id: i32, now: DateTime<Utc>) -> AppResult<String> {
        let _gate = self.gate.enter().await;

        let user = self.user(user_id).await?;
        let book = self.book(book_id).await?;
        let price = book.effective_sell_price(self.config.default_sell_price);

        if user.balance <= price {
            return Err(LendingRejection::InsufficientBalance {
                balance: user.balance,
                required: price,
            }
            .into());
        }
        if book.amount <= 0 || !self.inventory.reserve(book.id).await? {
            return Err(LendingRejection::BookAmountLimit.into());
        }

        let sale = NewLoan {
            book_id: book.id,
            user_id: user.id,
            taken_date: now,
            returning_date: Some(now),
            valid_borrowed_days: SALE_SENTINEL_DAYS,
            bill: price,
            status: LoanStatus::Sold,
        };
        let record = match self.store.create_loan(&sale).await {
            Ok(record) => record,
            Err(e) => {
                self.inventory.release_after_failure(book.id).await;
                return Err(e);
            }
        };

        if let Err(e) = self.store.update_user_balance(user.id, user.balance - price).await {
            if let Err(cleanup) = self.store.delete_loan(record.id).await {
                tracing::error!(loan_id = record.id, error = %cleanup, "Could not remove unpaid sale record");
            }
            self.inventory.release_after_failure(book.id).await;
            return Err(e);
        }

        tracing::info!(loan_id = record.id, user_id, book_id, price = %price, "Book sold");
        Ok(format!(
            "Book[{}({})] has been sold to {} | Price: {}",
            book.name, book.id, user.email, price
        ))
    }

    /// Every loan record of a user, malformed records left out
    pub async fn user_loans(&self, user_id: i32) -> AppResult<Vec<Loan>> {
        self.user(user_id).await?;
        let records = self.store.list_loans_by_user(user_id).await?;
        Ok(decode_loans(records))
    }

    /// Distinct books the user has had loans on, filtered by `filter`.
    /// Empty names and zero values do not filter.
    pub async fn find_user_books(&self, user_id: i32, filter: &UserBooksFilter) -> AppResult<Vec<Book>> {
        self.user(user_id).await?;
        let filter = filter.normalized();

        let mut seen = HashSet::new();
        let mut books = Vec::new();
        for record in self.store.list_loans_by_user(user_id).await? {
            if !seen.insert(record.book_id) {
                continue;
            }
            let Some(book) = self.store.get_book_by_id(record.book_id).await? else {
                continue;
            };
            if self.matches(&book, &filter).await? {
                books.push(book);
            }
        }
        Ok(books)
    }

    async fn matches(&self, book: &Book, filter: &UserBooksFilter) -> AppResult<bool> {
        if filter.is_empty() {
            return Ok(true);
        }
        if filter.name.as_deref().is_some_and(|name| book.name.contains(name)) {
            return Ok(true);
        }
        if filter.category_id == Some(book.category_id) {
            return Ok(true);
        }
        if let Some(times) = filter.borrowed_times {
            if self.store.list_loans_by_book(book.id).await?.len() == times {
                return Ok(true);
            }
        }
        Ok(filter.amount == Some(book.amount))
    }

    async fn user(&self, id: i32) -> AppResult<User> {
        self.store
            .get_user_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    async fn book(&self, id: i32) -> AppResult<Book> {
        self.store
            .get_book_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn category(&self, id: i32) -> AppResult<Category> {
        self.store
            .get_category_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category with id {} not found", id)))
    }

    /// Book, category and user an existing loan refers to. A dangling
    /// reference is a storage anomaly, not a missing resource of the caller.
    async fn loan_parties(&self, loan: &Loan) -> AppResult<(Book, Category, User)> {
        let book = self.store.get_book_by_id(loan.book_id).await?;
        let category = match &book {
            Some(book) => self.store.get_category_by_id(book.category_id).await?,
            None => None,
        };
        let user = self.store.get_user_by_id(loan.user_id).await?;

        match (book, category, user) {
            (Some(book), Some(category), Some(user)) => Ok((book, category, user)),
            (book, category, user) => {
                tracing::error!(
                    loan_id = loan.id,
                    book_id = loan.book_id,
                    user_id = loan.user_id,
                    book_missing = book.is_none(),
                    category_missing = category.is_none(),
                    user_missing = user.is_none(),
                    "Loan references missing records"
                );
                Err(AppError::DataIntegrity(format!(
                    "Loan {} references missing records",
                    loan.id
                )))
            }
        }
    }

    async fn restore_loan(&self, previous: &Loan) {
        if let Err(e) = self.store.update_loan(&LoanRecord::from(previous)).await {
            tracing::error!(loan_id = previous.id, error = %e, "Could not restore loan after failed return");
        }
    }

    async fn restore_balance(&self, user: &User) {
        if let Err(e) = self.store.update_user_balance(user.id, user.balance).await {
            tracing::error!(user_id = user.id, error = %e, "Could not restore balance after failed return");
        }
    }
}
