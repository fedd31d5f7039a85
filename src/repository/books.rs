//! Catalog store: books and their physical copies

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{book::Book, book_copy::BookCopy},
};

use super::{is_foreign_key_violation, is_unique_violation};

/// Lookups return `Ok(None)` when the row does not exist, so a missing record
/// is never confused with a failed query.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn save_book(&self, book: &Book) -> AppResult<Book>;
    async fn find_book(&self, id: Uuid) -> AppResult<Option<Book>>;
    async fn update_book(&self, book: &Book) -> AppResult<Option<Book>>;
    async fn delete_book(&self, id: Uuid) -> AppResult<bool>;

    /// Save a new copy and add one to its book's quantity, as a single unit.
    /// Returns the updated book; nothing is written if the book does not exist.
    async fn add_copy(&self, copy: &BookCopy) -> AppResult<Book>;
    async fn find_copy(&self, id: Uuid) -> AppResult<Option<BookCopy>>;
    async fn update_copy(&self, copy: &BookCopy) -> AppResult<Option<BookCopy>>;
    async fn delete_copy(&self, id: Uuid) -> AppResult<bool>;
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for BooksRepository {
    async fn save_book(&self, book: &Book) -> AppResult<Book> {
        let saved = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (
                id, title, publisher, year_published, call_number, cover_picture,
                isbn, book_collation, edition, description, loc_classification,
                subjects, authors, quantity, added_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.publisher)
        .bind(book.year_published)
        .bind(&book.call_number)
        .bind(&book.cover_picture)
        .bind(&book.isbn)
        .bind(&book.collation)
        .bind(book.edition)
        .bind(&book.description)
        .bind(&book.loc_classification)
        .bind(&book.subjects)
        .bind(&book.authors)
        .bind(book.quantity)
        .bind(book.added_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Book {} already exists", book.id))
            } else {
                AppError::Database(e)
            }
        })?;

        Ok(saved)
    }

    async fn find_book(&self, id: Uuid) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn update_book(&self, book: &Book) -> AppResult<Option<Book>> {
        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = $2, publisher = $3, year_published = $4, call_number = $5,
                cover_picture = $6, isbn = $7, book_collation = $8, edition = $9,
                description = $10, loc_classification = $11, subjects = $12, authors = $13
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.publisher)
        .bind(book.year_published)
        .bind(&book.call_number)
        .bind(&book.cover_picture)
        .bind(&book.isbn)
        .bind(&book.collation)
        .bind(book.edition)
        .bind(&book.description)
        .bind(&book.loc_classification)
        .bind(&book.subjects)
        .bind(&book.authors)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn delete_book(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    AppError::Conflict(format!("Book {} has copies with loan history", id))
                } else {
                    AppError::Database(e)
                }
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_copy(&self, copy: &BookCopy) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO bookcopies (id, book_id, barcode, condition, added_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(copy.id)
        .bind(copy.book_id)
        .bind(&copy.barcode)
        .bind(&copy.condition)
        .bind(copy.added_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::NotFound(format!("Book with id {} not found", copy.book_id))
            } else if is_unique_violation(&e) {
                AppError::Conflict(format!("Book copy {} already exists", copy.id))
            } else {
                AppError::Database(e)
            }
        })?;

        let book = sqlx::query_as::<_, Book>(
            "UPDATE books SET quantity = quantity + 1 WHERE id = $1 RETURNING *",
        )
        .bind(copy.book_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(book) = book else {
            tx.rollback().await?;
            return Err(AppError::NotFound(format!(
                "Book with id {} not found",
                copy.book_id
            )));
        };

        tx.commit().await?;
        Ok(book)
    }

    async fn find_copy(&self, id: Uuid) -> AppResult<Option<BookCopy>> {
        let copy = sqlx::query_as::<_, BookCopy>("SELECT * FROM bookcopies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(copy)
    }

    async fn update_copy(&self, copy: &BookCopy) -> AppResult<Option<BookCopy>> {
        let updated = sqlx::query_as::<_, BookCopy>(
            "UPDATE bookcopies SET barcode = $2, condition = $3 WHERE id = $1 RETURNING *",
        )
        .bind(copy.id)
        .bind(&copy.barcode)
        .bind(&copy.condition)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_copy(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM bookcopies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    AppError::Conflict(format!("Book copy {} has loan history", id))
                } else {
                    AppError::Database(e)
                }
            })?;
        Ok(result.rows_affected() > 0)
    }
}
