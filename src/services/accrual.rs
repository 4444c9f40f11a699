//! Periodic billing of unresolved loans
//!
//! Every run walks the loans that are neither returned nor sold, charges one
//! cycle of category rent to each, and flags overdue ones. Each loan is its
//! own unit of work: a failure is logged and the run moves on.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{inventory::InventoryLedger, Store, WriteGate};
use crate::{
    config::OverdueRule,
    error::{AppError, AppResult},
    models::{Loan, LoanRecord, LoanStatus},
};

impl OverdueRule {
    /// Whether the accrual job flags `loan` as overdue at `now`
    pub fn marks_overdue(self, loan: &Loan, now: DateTime<Utc>) -> bool {
        match self {
            OverdueRule::TakenBeforeNow => loan.taken_date < now,
            OverdueRule::PastValidDays => loan.is_past_due(now),
        }
    }
}

/// Counters reported at the end of an accrual run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccrualSummary {
    pub processed: usize,
    pub charged: usize,
    pub marked_overdue: usize,
    /// Records dropped because their book or user no longer exists
    pub discarded: usize,
    /// Loans resolved between listing and processing
    pub skipped: usize,
    pub failed: usize,
}

enum Step {
    Charged { newly_overdue: bool },
    Discarded,
    Skipped,
}

#[derive(Clone)]
pub struct AccrualJob {
    store: Store,
    gate: WriteGate,
    rule: OverdueRule,
    inventory: InventoryLedger,
}

impl AccrualJob {
    pub fn new(store: Store, gate: WriteGate, rule: OverdueRule) -> Self {
        Self {
            inventory: InventoryLedger::new(store.clone()),
            store,
            gate,
            rule,
        }
    }

    /// Entry point for the periodic trigger
    pub async fn run_daily_accrual(&self) -> AppResult<AccrualSummary> {
        self.run_accrual_at(Utc::now()).await
    }

    /// Run one accrual pass as of `now`.
    ///
    /// Only a failure to list the loans aborts the run.
    pub async fn run_accrual_at(&self, now: DateTime<Utc>) -> AppResult<AccrualSummary> {
        tracing::info!("(Daily) Checking taken books bills");
        let records = self.store.list_unresolved_loans().await?;
        tracing::info!(count = records.len(), "(Daily) Processing taken books");

        let mut summary = AccrualSummary::default();
        for record in records {
            let loan_id = record.id;
            summary.processed += 1;
            match self.accrue(record, now).await {
                Ok(Step::Charged { newly_overdue }) => {
                    summary.charged += 1;
                    if newly_overdue {
                        summary.marked_overdue += 1;
                    }
                }
                Ok(Step::Discarded) => summary.discarded += 1,
                Ok(Step::Skipped) => summary.skipped += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(loan_id, error = %e, "Accrual failed for loan, skipping");
                }
            }
        }

        tracing::info!(
            processed = summary.processed,
            charged = summary.charged,
            marked_overdue = summary.marked_overdue,
            discarded = summary.discarded,
            skipped = summary.skipped,
            failed = summary.failed,
            "(Daily) Finished checking taken books bills"
        );
        Ok(summary)
    }

    async fn accrue(&self, listed: LoanRecord, now: DateTime<Utc>) -> AppResult<Step> {
        let _gate = self.gate.enter().await;

        // Re-read under the gate, a return may have landed since the listing
        let Some(record) = self.store.get_loan_by_id(listed.id).await? else {
            return Ok(Step::Skipped);
        };

        let book = self.store.get_book_by_id(record.book_id).await?;
        let user = self.store.get_user_by_id(record.user_id).await?;
        let (book, user) = match (book, user) {
            (Some(book), Some(user)) => (book, user),
            (book, user) => {
                tracing::warn!(
                    loan_id = record.id,
                    book_id = record.book_id,
                    user_id = record.user_id,
                    book_missing = book.is_none(),
                    user_missing = user.is_none(),
                    "Loan references a missing book or user, discarding it"
                );
                self.store.delete_loan(record.id).await?;
                if book.is_some() {
                    self.inventory.write_off(record.book_id, record.id, "loan discarded during accrual");
                }
                return Ok(Step::Discarded);
            }
        };

        let mut loan = Loan::try_from(record)?;
        if loan.status.is_terminal() {
            return Ok(Step::Skipped);
        }

        let category = self
            .store
            .get_category_by_id(book.category_id)
            .await?
            .ok_or_else(|| {
                AppError::DataIntegrity(format!(
                    "Book {} references missing category {}",
                    book.id, book.category_id
                ))
            })?;

        let previous = LoanRecord::from(&loan);
        loan.charge(category.rent_price)?;
        let newly_overdue = self.rule.marks_overdue(&loan, now) && loan.status != LoanStatus::Overdue;
        if newly_overdue {
            loan.transition_to(LoanStatus::Overdue)?;
        }

        self.store.update_loan(&LoanRecord::from(&loan)).await?;
        if let Err(e) = self
            .store
            .update_user_balance(user.id, user.balance - category.rent_price)
            .await
        {
            if let Err(restore) = self.store.update_loan(&previous).await {
                tracing::error!(loan_id = loan.id, error = %restore, "Could not restore loan after failed charge");
            }
            return Err(e);
        }

        tracing::debug!(
            loan_id = loan.id,
            user_id = user.id,
            rent = %category.rent_price,
            bill = %loan.bill,
            newly_overdue,
            "Loan charged"
        );
        Ok(Step::Charged { newly_overdue })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{loan::encode_timestamp, Book, Category, User};
    use crate::repository::MockLibraryStore;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn record(id: i32) -> LoanRecord {
        LoanRecord {
            id,
            book_id: 10,
            user_id: 20,
            taken_date: encode_timestamp(now() - Duration::days(2)),
            returning_date: None,
            valid_borrowed_days: 30,
            bill: dec!(0),
            status: LoanStatus::Taken.into(),
        }
    }

    fn store_with(records: Vec<LoanRecord>) -> MockLibraryStore {
        let by_id: HashMap<i32, LoanRecord> = records.iter().map(|r| (r.id, r.clone())).collect();
        let mut store = MockLibraryStore::new();
        store
            .expect_list_unresolved_loans()
            .returning(move || Ok(records.clone()));
        store
            .expect_get_loan_by_id()
            .returning(move |id| Ok(by_id.get(&id).cloned()));
        store.expect_get_book_by_id().returning(|id| {
            Ok(Some(Book {
                id,
                name: "Dune".to_string(),
                category_id: 1,
                serial_number: "SN".to_string(),
                amount: 1,
                sell_price: None,
            }))
        });
        store.expect_get_user_by_id().returning(|id| {
            Ok(Some(User {
                id,
                email: "reader@example.org".to_string(),
                balance: dec!(100),
            }))
        });
        store.expect_get_category_by_id().returning(|id| {
            Ok(Some(Category {
                id,
                name: "Novels".to_string(),
                limit: 2,
                rent_price: dec!(10),
                overdue_penalty: dec!(5),
            }))
        });
        store
    }

    fn job(store: MockLibraryStore, rule: OverdueRule) -> AccrualJob {
        AccrualJob::new(Arc::new(store), WriteGate::new(), rule)
    }

    #[test]
    fn taken_before_now_flags_any_past_loan() {
        let loan = Loan::try_from(record(1)).unwrap();
        assert!(OverdueRule::TakenBeforeNow.marks_overdue(&loan, now()));
        assert!(!OverdueRule::PastValidDays.marks_overdue(&loan, now()));
        assert!(OverdueRule::PastValidDays.marks_overdue(&loan, now() + Duration::days(29)));
    }

    #[tokio::test]
    async fn one_failing_loan_does_not_abort_the_batch() {
        let mut store = store_with(vec![record(1), record(2)]);
        store
            .expect_update_loan()
            .withf(|l| l.id == 1)
            .times(1)
            .returning(|_| Err(AppError::Internal("disk full".to_string())));
        store
            .expect_update_loan()
            .withf(|l| l.id == 2)
            .times(1)
            .returning(|_| Ok(()));
        store
            .expect_update_user_balance()
            .withf(|user_id, balance| *user_id == 20 && *balance == dec!(90))
            .times(1)
            .returning(|_, _| Ok(()));

        let summary = job(store, OverdueRule::TakenBeforeNow)
            .run_accrual_at(now())
            .await
            .unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.charged, 1);
        assert_eq!(summary.marked_overdue, 1);
    }

    #[tokio::test]
    async fn failed_balance_write_restores_the_loan() {
        let original = record(1);
        let writes = Arc::new(Mutex::new(Vec::new()));
        let seen = writes.clone();

        let mut store = store_with(vec![original.clone()]);
        store.expect_update_loan().times(2).returning(move |l| {
            seen.lock().unwrap().push(l.clone());
            Ok(())
        });
        store
            .expect_update_user_balance()
            .times(1)
            .returning(|_, _| Err(AppError::Internal("connection reset".to_string())));

        let summary = job(store, OverdueRule::PastValidDays)
            .run_accrual_at(now())
            .await
            .unwrap();

        assert_eq!(summary.failed, 1);
        let writes = writes.lock().unwrap();
        assert_eq!(writes[0].bill, dec!(10));
        assert_eq!(writes[1], original);
    }

    #[tokio::test]
    async fn listing_failure_is_reported() {
        let mut store = MockLibraryStore::new();
        store
            .expect_list_unresolved_loans()
            .returning(|| Err(AppError::Internal("unreachable".to_string())));

        let result = job(store, OverdueRule::TakenBeforeNow).run_daily_accrual().await;
        assert!(result.is_err());
    }
}
