//! Borrowing eligibility: overdue lock and per-category quota

use super::Store;
use crate::{
    error::{AppResult, LendingRejection},
    models::{Book, Category, LoanRecord, LoanStatus, User},
};

#[derive(Clone)]
pub struct EligibilityEvaluator {
    store: Store,
}

impl EligibilityEvaluator {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Check whether `user` may borrow `book`, naming the rule that refuses it.
    ///
    /// A user holding any overdue loan is locked out of every category.
    /// Otherwise the user's active loans in the book's category must stay
    /// below the category limit.
    ///
    /// Only the stored status and book of each loan are read, so a record
    /// with unreadable dates still counts. An unknown status code refuses
    /// the borrow.
    pub async fn check(&self, user: &User, book: &Book, category: &Category) -> AppResult<()> {
        let loans = self.user_loan_statuses(user.id).await?;

        if loans.iter().any(|(_, status)| *status == LoanStatus::Overdue) {
            return Err(LendingRejection::OutstandingOverdueLock.into());
        }

        let mut active = 0;
        for (record, _) in loans.iter().filter(|(_, status)| status.is_active()) {
            match self.store.get_book_by_id(record.book_id).await? {
                Some(held) if held.category_id == book.category_id => active += 1,
                Some(_) => {}
                None => tracing::warn!(loan_id = record.id, book_id = record.book_id, "Active loan references a missing book"),
            }
        }

        if active >= category.limit.max(0) as usize {
            return Err(LendingRejection::CategoryLimitExceeded {
                category_id: category.id,
                active,
                limit: category.limit,
            }
            .into());
        }
        Ok(())
    }

    /// Same as [`check`](Self::check) without the reason
    pub async fn can_borrow(&self, user: &User, book: &Book, category: &Category) -> AppResult<bool> {
        match self.check(user, book, category).await {
            Ok(()) => Ok(true),
            Err(crate::error::AppError::Rejected(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn user_loan_statuses(&self, user_id: i32) -> AppResult<Vec<(LoanRecord, LoanStatus)>> {
        let records = self.store.list_loans_by_user(user_id).await?;
        records
            .into_iter()
            .map(|record| -> AppResult<(LoanRecord, LoanStatus)> {
                let status = LoanStatus::try_from(record.status).map_err(|e| {
                    tracing::error!(loan_id = record.id, user_id, error = %e, "Cannot assess eligibility over a malformed loan");
                    e
                })?;
                Ok((record, status))
            })
            .collect()
    }
}
