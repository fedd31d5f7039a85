//! Catalog management service: books, copies and the copy counter

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, CreateBook, UpdateBook},
        book_copy::{BookCopy, CreateBookCopy, UpdateBookCopy},
    },
    repository::Repository,
};

use super::{clock::Clock, StoreTimeout};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    clock: Arc<dyn Clock>,
    timeout: StoreTimeout,
}

impl CatalogService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>, timeout: StoreTimeout) -> Self {
        Self {
            repository,
            clock,
            timeout,
        }
    }

    /// Get book by ID
    pub async fn get_book(&self, id: Uuid) -> AppResult<Book> {
        self.timeout
            .run(self.repository.catalog.find_book(id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Create a new book, with no copies yet
    pub async fn create_book(&self, request: CreateBook) -> AppResult<Book> {
        let book = Book::new(request, self.clock.now());
        let book = self
            .timeout
            .run(self.repository.catalog.save_book(&book))
            .await?;
        tracing::info!(book_id = %book.id, title = %book.title, "Book created");
        Ok(book)
    }

    /// Update bibliographic fields. The copy counter is left alone.
    pub async fn update_book(&self, id: Uuid, request: UpdateBook) -> AppResult<Book> {
        let mut book = self.get_book(id).await?;
        book.apply(request);

        self.timeout
            .run(self.repository.catalog.update_book(&book))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    pub async fn delete_book(&self, id: Uuid) -> AppResult<()> {
        let deleted = self
            .timeout
            .run(self.repository.catalog.delete_book(id))
            .await?;
        if !deleted {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        tracing::info!(book_id = %id, "Book deleted");
        Ok(())
    }

    /// Add a physical copy to a book. The copy and the book's new quantity are
    /// stored together; an unknown book leaves both untouched.
    pub async fn create_copy(&self, book_id: Uuid, request: CreateBookCopy) -> AppResult<BookCopy> {
        self.get_book(book_id).await?;

        let copy = BookCopy::new(book_id, request, self.clock.now());
        let book = self
            .timeout
            .run(self.repository.catalog.add_copy(&copy))
            .await?;

        tracing::info!(
            copy_id = %copy.id,
            book_id = %book_id,
            quantity = book.quantity,
            "Book copy created"
        );
        Ok(copy)
    }

    /// Get a copy, checking it belongs to `book_id`
    pub async fn get_copy(&self, book_id: Uuid, copy_id: Uuid) -> AppResult<BookCopy> {
        let copy = self
            .timeout
            .run(self.repository.catalog.find_copy(copy_id))
            .await?
            .filter(|copy| copy.book_id == book_id)
            .ok_or(AppError::UnknownCopy(copy_id))?;
        Ok(copy)
    }

    pub async fn update_copy(
        &self,
        book_id: Uuid,
        copy_id: Uuid,
        request: UpdateBookCopy,
    ) -> AppResult<BookCopy> {
        let mut copy = self.get_copy(book_id, copy_id).await?;
        copy.apply(request);

        self.timeout
            .run(self.repository.catalog.update_copy(&copy))
            .await?
            .ok_or(AppError::UnknownCopy(copy_id))
    }

    pub async fn delete_copy(&self, book_id: Uuid, copy_id: Uuid) -> AppResult<()> {
        self.get_copy(book_id, copy_id).await?;

        let deleted = self
            .timeout
            .run(self.repository.catalog.delete_copy(copy_id))
            .await?;
        if !deleted {
            return Err(AppError::UnknownCopy(copy_id));
        }
        tracing::info!(copy_id = %copy_id, book_id = %book_id, "Book copy deleted");
        Ok(())
    }
}
