//! Data models for Bookkeep

pub mod book;
pub mod loan;
pub mod stats;
pub mod user;

// Re-export commonly used types
pub use book::{Book, Category};
pub use loan::{Loan, LoanRecord, LoanStatus, NewLoan, ReturnOutcome};
pub use stats::{StatisticsReport, ViolationEntry};
pub use user::User;
