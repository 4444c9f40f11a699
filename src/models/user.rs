//! User model (the lending engine only needs identity and balance)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// User account from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub email: String,
    /// Prepaid balance; rent, penalties and purchases are deducted from it
    pub balance: Decimal,
}
