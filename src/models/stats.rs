//! Reporting types

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

/// Count and summed bills of one group of loans
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct BucketSummary {
    pub count: usize,
    pub gain: Decimal,
}

impl BucketSummary {
    pub fn add(&mut self, bill: Decimal) {
        self.count += 1;
        self.gain += bill;
    }
}

/// Library-wide statistics over every loan record
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StatisticsReport {
    pub message: String,
    /// Sales
    pub sold: BucketSummary,
    /// Rentals that were returned, on time or late
    pub rented: BucketSummary,
    /// Rentals not returned yet
    pub in_rent: BucketSummary,
    /// Summed bills keyed by category id; every category is present
    pub by_category: BTreeMap<i32, Decimal>,
    /// Records left out because their status code is unknown
    pub skipped: usize,
}

/// One user's overdue record count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ViolationEntry {
    pub user_id: i32,
    pub email: String,
    pub count: usize,
}
