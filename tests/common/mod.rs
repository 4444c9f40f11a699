//! Shared fixtures for the integration tests
#![allow(dead_code)]

use std::sync::Arc;

use bookkeep_server::{
    config::{AccrualConfig, LendingConfig, OverdueRule},
    models::{loan::encode_timestamp, Book, Category, LoanRecord, LoanStatus, User},
    repository::{memory::MemoryStore, LibraryStore},
    services::Services,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;

/// Fixed reference instant for deterministic tests
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    now() - Duration::days(days)
}

pub struct Library {
    pub store: Arc<MemoryStore>,
    pub services: Services,
}

impl Library {
    pub fn new() -> Self {
        Self::with_rule(OverdueRule::TakenBeforeNow)
    }

    pub fn with_rule(rule: OverdueRule) -> Self {
        let store = Arc::new(MemoryStore::new());
        let accrual = AccrualConfig {
            overdue_rule: rule,
            ..AccrualConfig::default()
        };
        let services = Services::new(store.clone(), LendingConfig::default(), accrual);
        Self { store, services }
    }

    pub async fn category(&self, id: i32, limit: i32, rent_price: Decimal, overdue_penalty: Decimal) {
        self.store
            .insert_category(Category {
                id,
                name: format!("Category {}", id),
                limit,
                rent_price,
                overdue_penalty,
            })
            .await;
    }

    pub async fn book(&self, id: i32, category_id: i32, amount: i32, sell_price: Option<Decimal>) {
        self.store
            .insert_book(Book {
                id,
                name: format!("Book {}", id),
                category_id,
                serial_number: format!("SN-{}", id),
                amount,
                sell_price,
            })
            .await;
    }

    pub async fn user(&self, id: i32, balance: Decimal) {
        self.store
            .insert_user(User {
                id,
                email: format!("user{}@example.org", id),
                balance,
            })
            .await;
    }

    /// Seed a loan record directly, bypassing the lending rules
    pub async fn loan(
        &self,
        id: i32,
        book_id: i32,
        user_id: i32,
        taken: DateTime<Utc>,
        valid_borrowed_days: i32,
        status: LoanStatus,
        bill: Decimal,
    ) {
        self.store
            .insert_loan_record(LoanRecord {
                id,
                book_id,
                user_id,
                taken_date: encode_timestamp(taken),
                returning_date: None,
                valid_borrowed_days,
                bill,
                status: status.into(),
            })
            .await;
    }

    /// Seed a loan record exactly as stored, unreadable fields included
    pub async fn raw_loan(&self, id: i32, book_id: i32, user_id: i32, taken_date: &str, status: i16, bill: Decimal) {
        self.store
            .insert_loan_record(LoanRecord {
                id,
                book_id,
                user_id,
                taken_date: taken_date.to_string(),
                returning_date: None,
                valid_borrowed_days: 30,
                bill,
                status,
            })
            .await;
    }

    pub async fn balance(&self, user_id: i32) -> Decimal {
        self.store.get_user_by_id(user_id).await.unwrap().unwrap().balance
    }

    pub async fn amount(&self, book_id: i32) -> i32 {
        self.store.get_book_by_id(book_id).await.unwrap().unwrap().amount
    }

    pub async fn record(&self, loan_id: i32) -> Option<LoanRecord> {
        self.store.get_loan_by_id(loan_id).await.unwrap()
    }
}
