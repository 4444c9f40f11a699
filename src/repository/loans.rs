//! Loans ("taken books") repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::loan::{LoanRecord, LoanStatus, NewLoan},
};

const SELECT_LOANS: &str = r#"
    SELECT id, book_id, user_id, taken_date, returning_date,
           valid_borrowed_days, bill, status
    FROM taken_books
"#;

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Option<LoanRecord>> {
        let loan = sqlx::query_as::<_, LoanRecord>(&format!("{} WHERE id = $1", SELECT_LOANS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(loan)
    }

    /// Get every loan of a user
    pub async fn list_by_user(&self, user_id: i32) -> AppResult<Vec<LoanRecord>> {
        let loans = sqlx::query_as::<_, LoanRecord>(&format!(
            "{} WHERE user_id = $1 ORDER BY id",
            SELECT_LOANS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    /// Get every loan of a book
    pub async fn list_by_book(&self, book_id: i32) -> AppResult<Vec<LoanRecord>> {
        let loans = sqlx::query_as::<_, LoanRecord>(&format!(
            "{} WHERE book_id = $1 ORDER BY id",
            SELECT_LOANS
        ))
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    /// Get every loan
    pub async fn list_all(&self) -> AppResult<Vec<LoanRecord>> {
        let loans = sqlx::query_as::<_, LoanRecord>(&format!("{} ORDER BY id", SELECT_LOANS))
            .fetch_all(&self.pool)
            .await?;
        Ok(loans)
    }

    /// Get loans not yet received, delivered late or sold
    pub async fn list_unresolved(&self) -> AppResult<Vec<LoanRecord>> {
        let loans = sqlx::query_as::<_, LoanRecord>(&format!(
            "{} WHERE status NOT IN ($1, $2, $3) ORDER BY id",
            SELECT_LOANS
        ))
        .bind(i16::from(LoanStatus::Received))
        .bind(i16::from(LoanStatus::OverdueDelivered))
        .bind(i16::from(LoanStatus::Sold))
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    /// Create a new loan
    pub async fn create(&self, loan: &NewLoan) -> AppResult<LoanRecord> {
        // The id placeholder is replaced by the one the database assigns
        let record = loan.clone().into_record(0);
        let created = sqlx::query_as::<_, LoanRecord>(
            r#"
            INSERT INTO taken_books
                (book_id, user_id, taken_date, returning_date, valid_borrowed_days, bill, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, book_id, user_id, taken_date, returning_date,
                      valid_borrowed_days, bill, status
            "#,
        )
        .bind(record.book_id)
        .bind(record.user_id)
        .bind(&record.taken_date)
        .bind(&record.returning_date)
        .bind(record.valid_borrowed_days)
        .bind(record.bill)
        .bind(record.status)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// Overwrite the mutable columns of a loan
    pub async fn update(&self, loan: &LoanRecord) -> AppResult<()> {
        let rows = sqlx::query(
            r#"
            UPDATE taken_books
            SET returning_date = $2, bill = $3, status = $4
            WHERE id = $1
            "#,
        )
        .bind(loan.id)
        .bind(&loan.returning_date)
        .bind(loan.bill)
        .bind(loan.status)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(AppError::NotFound(format!("Loan with id {} not found", loan.id)));
        }
        Ok(())
    }

    /// Delete a loan
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        sqlx::query("DELETE FROM taken_books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
