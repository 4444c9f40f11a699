//! Loan ("taken book") model and related types

use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// `valid_borrowed_days` value stored on sale records
pub const SALE_SENTINEL_DAYS: i32 = -1;

/// Loan lifecycle status, persisted as a small integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum LoanStatus {
    Taken = 0,
    Received = 1,
    Overdue = 2,
    OverdueDelivered = 3,
    Sold = 4,
}

impl LoanStatus {
    /// No transition ever leaves a terminal status
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LoanStatus::Received | LoanStatus::OverdueDelivered | LoanStatus::Sold
        )
    }

    /// Loan still holds a copy and counts against the category limit
    pub fn is_active(self) -> bool {
        matches!(self, LoanStatus::Taken | LoanStatus::Overdue)
    }

    /// Status counted as an overdue violation in reports
    pub fn is_violation(self) -> bool {
        matches!(self, LoanStatus::Overdue | LoanStatus::OverdueDelivered)
    }

    pub fn can_transition_to(self, next: LoanStatus) -> bool {
        use LoanStatus::*;
        match (self, next) {
            (Taken, Overdue | Received | OverdueDelivered) => true,
            (Overdue, Overdue | Received | OverdueDelivered) => true,
            _ => false,
        }
    }
}

impl TryFrom<i16> for LoanStatus {
    type Error = AppError;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(LoanStatus::Taken),
            1 => Ok(LoanStatus::Received),
            2 => Ok(LoanStatus::Overdue),
            3 => Ok(LoanStatus::OverdueDelivered),
            4 => Ok(LoanStatus::Sold),
            other => Err(AppError::DataIntegrity(format!("Unknown loan status code {}", other))),
        }
    }
}

impl From<LoanStatus> for i16 {
    fn from(status: LoanStatus) -> Self {
        status as i16
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LoanStatus::Taken => "taken",
            LoanStatus::Received => "received",
            LoanStatus::Overdue => "overdue",
            LoanStatus::OverdueDelivered => "overdue delivered",
            LoanStatus::Sold => "sold",
        };
        write!(f, "{}", label)
    }
}

/// Format a timestamp the way it is persisted
pub fn encode_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a persisted timestamp. Naive timestamps are read as UTC.
pub fn parse_timestamp(raw: &str) -> AppResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| AppError::DataIntegrity(format!("Unparsable timestamp '{}'", raw)))
}

/// Loan row exactly as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct LoanRecord {
    pub id: i32,
    pub book_id: i32,
    pub user_id: i32,
    pub taken_date: String,
    pub returning_date: Option<String>,
    pub valid_borrowed_days: i32,
    pub bill: Decimal,
    pub status: i16,
}

/// Loan with decoded status and timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub book_id: i32,
    pub user_id: i32,
    pub taken_date: DateTime<Utc>,
    pub returning_date: Option<DateTime<Utc>>,
    /// Fixed at creation; `-1` marks a sale
    pub valid_borrowed_days: i32,
    /// Accrued charge, never decreases
    pub bill: Decimal,
    pub status: LoanStatus,
}

impl TryFrom<LoanRecord> for Loan {
    type Error = AppError;

    fn try_from(record: LoanRecord) -> Result<Self, Self::Error> {
        Ok(Loan {
            id: record.id,
            book_id: record.book_id,
            user_id: record.user_id,
            taken_date: parse_timestamp(&record.taken_date)?,
            returning_date: record
                .returning_date
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
            valid_borrowed_days: record.valid_borrowed_days,
            bill: record.bill,
            status: LoanStatus::try_from(record.status)?,
        })
    }
}

impl From<&Loan> for LoanRecord {
    fn from(loan: &Loan) -> Self {
        LoanRecord {
            id: loan.id,
            book_id: loan.book_id,
            user_id: loan.user_id,
            taken_date: encode_timestamp(loan.taken_date),
            returning_date: loan.returning_date.map(encode_timestamp),
            valid_borrowed_days: loan.valid_borrowed_days,
            bill: loan.bill,
            status: loan.status.into(),
        }
    }
}

impl Loan {
    pub fn is_sale(&self) -> bool {
        self.valid_borrowed_days == SALE_SENTINEL_DAYS
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        now - self.taken_date
    }

    /// Loan has run longer than its valid borrowed days
    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        self.elapsed(now) > Duration::days(self.valid_borrowed_days as i64)
    }

    /// Move to `next`, refusing any transition out of a terminal status
    pub fn transition_to(&mut self, next: LoanStatus) -> AppResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::DataIntegrity(format!(
                "Loan {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    /// Add `amount` to the bill
    pub fn charge(&mut self, amount: Decimal) -> AppResult<()> {
        if amount.is_sign_negative() {
            return Err(AppError::Validation(format!(
                "Cannot charge a negative amount ({}) on loan {}",
                amount, self.id
            )));
        }
        self.bill += amount;
        Ok(())
    }
}

/// Loan to be inserted; the store assigns the id
#[derive(Debug, Clone, PartialEq)]
pub struct NewLoan {
    pub book_id: i32,
    pub user_id: i32,
    pub taken_date: DateTime<Utc>,
    pub returning_date: Option<DateTime<Utc>>,
    pub valid_borrowed_days: i32,
    pub bill: Decimal,
    pub status: LoanStatus,
}

impl NewLoan {
    /// Persisted shape carrying the store-assigned id
    pub fn into_record(self, id: i32) -> LoanRecord {
        LoanRecord {
            id,
            book_id: self.book_id,
            user_id: self.user_id,
            taken_date: encode_timestamp(self.taken_date),
            returning_date: self.returning_date.map(encode_timestamp),
            valid_borrowed_days: self.valid_borrowed_days,
            bill: self.bill,
            status: self.status.into(),
        }
    }
}

/// Borrow or buy request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoanRequest {
    #[validate(range(min = 1))]
    pub user_id: i32,
    #[validate(range(min = 1))]
    pub book_id: i32,
}

/// Result of a return request
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnOutcome {
    /// The loan was resolved by this call
    Delivered { message: String, loan: Loan },
    /// The loan had already been resolved; nothing changed
    AlreadyDelivered { message: String },
}
