//! Book and category models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Book model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub name: String,
    pub category_id: i32,
    pub serial_number: String,
    /// Copies currently on hand
    pub amount: i32,
    pub sell_price: Option<Decimal>,
}

impl Book {
    /// Sell price, falling back to `default` when unset or zero
    pub fn effective_sell_price(&self, default: Decimal) -> Decimal {
        match self.sell_price {
            Some(price) if !price.is_zero() => price,
            _ => default,
        }
    }
}

/// Category model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Category {
    pub id: i32,
    pub name: String,
    /// Max concurrent active loans a single user may hold in this category
    #[sqlx(rename = "borrow_limit")]
    pub limit: i32,
    /// Charged on every accrual cycle
    pub rent_price: Decimal,
    /// Flat charge added once when a loan is returned late
    pub overdue_penalty: Decimal,
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1))]
    pub name: String,
    pub category_id: i32,
    #[serde(default)]
    pub serial_number: String,
    #[validate(range(min = 0))]
    pub amount: i32,
    pub sell_price: Option<Decimal>,
}

/// Update book request, absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    pub category_id: Option<i32>,
    pub serial_number: Option<String>,
    #[validate(range(min = 0))]
    pub amount: Option<i32>,
    pub sell_price: Option<Decimal>,
}

/// Create category request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCategory {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(range(min = 0))]
    pub limit: i32,
    pub rent_price: Decimal,
    pub overdue_penalty: Decimal,
}

/// Update category request, absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCategory {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[validate(range(min = 0))]
    pub limit: Option<i32>,
    pub rent_price: Option<Decimal>,
    pub overdue_penalty: Option<Decimal>,
}

/// Filter over the books a user has had loans on.
///
/// A book is kept when it matches any of the supplied criteria; with no
/// criteria every book is kept.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserBooksFilter {
    /// Substring of the book name
    pub name: Option<String>,
    pub category_id: Option<i32>,
    /// Total number of loans recorded for the book
    pub borrowed_times: Option<usize>,
    pub amount: Option<i32>,
}

impl UserBooksFilter {
    /// Same filter without the criteria holding an empty name or a zero
    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.clone().filter(|name| !name.is_empty()),
            category_id: self.category_id.filter(|&id| id != 0),
            borrowed_times: self.borrowed_times.filter(|&times| times != 0),
            amount: self.amount.filter(|&amount| amount != 0),
        }
    }

    /// No criterion left once empty and zero values are ignored
    pub fn is_empty(&self) -> bool {
        let filter = self.normalized();
        filter.name.is_none()
            && filter.category_id.is_none()
            && filter.borrowed_times.is_none()
            && filter.amount.is_none()
    }
}
