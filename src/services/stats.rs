//! Statistics service

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;

use super::Store;
use crate::{
    error::AppResult,
    models::{stats::BucketSummary, LoanRecord, LoanStatus, StatisticsReport, ViolationEntry},
};

#[derive(Clone)]
pub struct StatsService {
    store: Store,
}

impl StatsService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Sales, returned rentals and rentals in progress, with summed bills
    /// overall and per category.
    ///
    /// Dates play no part here, so records with unreadable dates are still
    /// counted. Records with an unknown status are reported as skipped.
    pub async fn statistics(&self) -> AppResult<StatisticsReport> {
        let records = self.store.list_all_loans().await?;

        let mut by_category: BTreeMap<i32, Decimal> = self
            .store
            .list_all_categories()
            .await?
            .into_iter()
            .map(|c| (c.id, Decimal::ZERO))
            .collect();

        let mut book_categories: HashMap<i32, Option<i32>> = HashMap::new();
        let mut sold = BucketSummary::default();
        let mut rented = BucketSummary::default();
        let mut in_rent = BucketSummary::default();
        let mut skipped = 0;

        for loan in &records {
            let Some(status) = known_status(loan) else {
                skipped += 1;
                continue;
            };
            let category_id = match book_categories.get(&loan.book_id) {
                Some(cached) => *cached,
                None => {
                    let category_id = self
                        .store
                        .get_book_by_id(loan.book_id)
                        .await?
                        .map(|b| b.category_id);
                    book_categories.insert(loan.book_id, category_id);
                    category_id
                }
            };
            if let Some(category_id) = category_id {
                *by_category.entry(category_id).or_default() += loan.bill;
            }

            match status {
                LoanStatus::Sold => sold.add(loan.bill),
                LoanStatus::Received | LoanStatus::OverdueDelivered => rented.add(loan.bill),
                LoanStatus::Taken | LoanStatus::Overdue => in_rent.add(loan.bill),
            }
        }

        Ok(StatisticsReport {
            message: "Statistics calculated".to_string(),
            sold,
            rented,
            in_rent,
            by_category,
            skipped,
        })
    }

    /// Users with at least one overdue or overdue-delivered loan, with their
    /// count, sorted by count in the requested direction (ties by user id).
    pub async fn violations(&self, ascending: bool) -> AppResult<Vec<ViolationEntry>> {
        let records = self.store.list_all_loans().await?;

        let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
        for loan in &records {
            if known_status(loan).is_some_and(LoanStatus::is_violation) {
                *counts.entry(loan.user_id).or_default() += 1;
            }
        }

        let mut entries = Vec::with_capacity(counts.len());
        for (user_id, count) in counts {
            match self.store.get_user_by_id(user_id).await? {
                Some(user) => entries.push(ViolationEntry {
                    user_id,
                    email: user.email,
                    count,
                }),
                None => tracing::warn!(user_id, "Overdue loans reference a missing user"),
            }
        }

        // `entries` is already in user id order, and the sort is stable.
        // The legacy service inverted `ascending`; it is honoured as written here.
        if ascending {
            entries.sort_by(|a, b| a.count.cmp(&b.count));
        } else {
            entries.sort_by(|a, b| b.count.cmp(&a.count));
        }
        Ok(entries)
    }
}

fn known_status(record: &LoanRecord) -> Option<LoanStatus> {
    LoanStatus::try_from(record.status)
        .map_err(|e| tracing::warn!(loan_id = record.id, error = %e, "Loan left out of reports"))
        .ok()
}
