//! Rental duration granted to a new loan

use chrono::{DateTime, Duration, Utc};

use super::Store;
use crate::{
    config::LendingConfig,
    error::AppResult,
    models::{Book, Loan},
};

#[derive(Clone)]
pub struct RentDurationCalculator {
    store: Store,
    config: LendingConfig,
}

impl RentDurationCalculator {
    pub fn new(store: Store, config: LendingConfig) -> Self {
        Self { store, config }
    }

    /// Days a new loan of `book` may run; 0 means no copy is available.
    pub async fn valid_rent_days(&self, book: &Book, now: DateTime<Utc>) -> AppResult<i32> {
        if book.amount <= 0 {
            return Ok(0);
        }
        let borrowed_cnt = self.borrowed_count(book.id, now).await?;
        Ok(rent_days(book.amount, borrowed_cnt, &self.config))
    }

    /// Outstanding loans of the book taken longer ago than the window
    async fn borrowed_count(&self, book_id: i32, now: DateTime<Utc>) -> AppResult<i32> {
        let window = Duration::days(self.config.recent_borrow_window_days);
        let count = self
            .store
            .list_loans_by_book(book_id)
            .await?
            .into_iter()
            .filter_map(|record| Loan::try_from(record).ok())
            .filter(|loan| loan.status.is_active() && now - loan.taken_date > window)
            .count();
        Ok(count as i32)
    }
}

/// Rental duration formula.
///
/// Historically written as `(base * n) / n + borrowed_cnt` with `n` the copy
/// count; the copy count cancels out, so only its zero case matters.
pub fn rent_days(amount: i32, borrowed_cnt: i32, config: &LendingConfig) -> i32 {
    if amount <= 0 {
        return 0;
    }
    (config.base_rent_days + borrowed_cnt).max(config.min_rent_days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_copies_means_no_rental() {
        let config = LendingConfig::default();
        assert_eq!(rent_days(0, 4, &config), 0);
        assert_eq!(rent_days(-2, 4, &config), 0);
    }

    #[test]
    fn copy_count_does_not_change_duration() {
        let config = LendingConfig::default();
        assert_eq!(rent_days(1, 0, &config), 30);
        assert_eq!(rent_days(17, 0, &config), 30);
        assert_eq!(rent_days(3, 2, &config), 32);
    }

    #[test]
    fn duration_has_a_floor() {
        let config = LendingConfig {
            base_rent_days: 1,
            ..LendingConfig::default()
        };
        assert_eq!(rent_days(5, 0, &config), 3);
        assert_eq!(rent_days(5, 1, &config), 3);
        assert_eq!(rent_days(5, 4, &config), 5);
    }
}
