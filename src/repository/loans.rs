//! Loans store for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::loan::Loan,
};

use super::is_unique_violation;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoanStore: Send + Sync {
    /// Persist a new open loan. Fails with `CopyAlreadyBorrowed` when the copy
    /// already has an open loan, whatever the caller checked beforehand.
    async fn insert(&self, loan: &Loan) -> AppResult<Loan>;
    async fn find(&self, id: Uuid) -> AppResult<Option<Loan>>;
    async fn find_open_by_user_and_copy(
        &self,
        user_id: Uuid,
        book_copy_id: Uuid,
    ) -> AppResult<Option<Loan>>;
    async fn is_open(&self, book_copy_id: Uuid) -> AppResult<bool>;
    /// Close a loan and add its fine to the borrower's total, atomically.
    /// Returns `None` if the loan was no longer open.
    async fn close(&self, loan: &Loan) -> AppResult<Option<Loan>>;
}

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanStore for LoansRepository {
    async fn insert(&self, loan: &Loan) -> AppResult<Loan> {
        // The partial unique index on open loans rejects a concurrent second borrow
        sqlx::query(
            r#"
            INSERT INTO loans (id, user_id, bookcopy_id, fine, borrowed_at, due_date, returned_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(loan.id)
        .bind(loan.user_id)
        .bind(loan.book_copy_id)
        .bind(loan.fine)
        .bind(loan.borrowed_at)
        .bind(loan.due_date)
        .bind(loan.returned_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::CopyAlreadyBorrowed(loan.book_copy_id)
            } else {
                AppError::Database(e)
            }
        })?;

        Ok(loan.clone())
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(loan)
    }

    async fn find_open_by_user_and_copy(
        &self,
        user_id: Uuid,
        book_copy_id: Uuid,
    ) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            SELECT * FROM loans
            WHERE user_id = $1 AND bookcopy_id = $2 AND returned_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(book_copy_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(loan)
    }

    async fn is_open(&self, book_copy_id: Uuid) -> AppResult<bool> {
        let open: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans WHERE bookcopy_id = $1 AND returned_at IS NULL)",
        )
        .bind(book_copy_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(open)
    }

    async fn close(&self, loan: &Loan) -> AppResult<Option<Loan>> {
        let mut tx = self.pool.begin().await?;

        let closed = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans SET fine = $2, returned_at = $3
            WHERE id = $1 AND returned_at IS NULL
            RETURNING *
            "#,
        )
        .bind(loan.id)
        .bind(loan.fine)
        .bind(loan.returned_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(closed) = closed else {
            tx.rollback().await?;
            return Ok(None);
        };

        if closed.fine > 0 {
            sqlx::query("UPDATE users SET total_fine = total_fine + $2 WHERE id = $1")
                .bind(closed.user_id)
                .bind(closed.fine)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(Some(closed))
    }
}
