//! In-process store used for local runs (`database.backend = "memory"`) and tests.
//!
//! All tables live behind one lock, so every store call is atomic with respect
//! to the others and the open-loan constraint holds under concurrent borrows.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{book::Book, book_copy::BookCopy, loan::Loan, user::Role, user::User},
};

use super::{CatalogStore, LoanStore, PatronStore};

#[derive(Default)]
struct Tables {
    books: HashMap<Uuid, Book>,
    copies: HashMap<Uuid, BookCopy>,
    users: HashMap<Uuid, User>,
    loans: HashMap<Uuid, Loan>,
}

impl Tables {
    fn user_by_handle(&self, handle: &str) -> Option<&User> {
        self.users.values().find(|u| u.handle == handle)
    }

    fn handle_taken(&self, handle: &str, except: Uuid) -> bool {
        self.users
            .values()
            .any(|u| u.handle == handle && u.id != except)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of loan rows, open or closed
    pub async fn loan_count(&self) -> usize {
        self.tables.lock().await.loans.len()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn save_book(&self, book: &Book) -> AppResult<Book> {
        let mut tables = self.tables.lock().await;
        if tables.books.contains_key(&book.id) {
            return Err(AppError::Conflict(format!("Book {} already exists", book.id)));
        }
        tables.books.insert(book.id, book.clone());
        Ok(book.clone())
    }

    async fn find_book(&self, id: Uuid) -> AppResult<Option<Book>> {
        Ok(self.tables.lock().await.books.get(&id).cloned())
    }

    async fn update_book(&self, book: &Book) -> AppResult<Option<Book>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.books.get_mut(&book.id).map(|stored| {
            let quantity = stored.quantity;
            *stored = Book {
                quantity,
                added_at: stored.added_at,
                ..book.clone()
            };
            stored.clone()
        }))
    }

    async fn delete_book(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.lock().await;
        let copies: Vec<Uuid> = tables
            .copies
            .values()
            .filter(|c| c.book_id == id)
            .map(|c| c.id)
            .collect();
        if tables.loans.values().any(|l| copies.contains(&l.book_copy_id)) {
            return Err(AppError::Conflict(format!(
                "Book {} has copies with loan history",
                id
            )));
        }
        let removed = tables.books.remove(&id).is_some();
        tables.copies.retain(|_, c| c.book_id != id);
        Ok(removed)
    }

    async fn add_copy(&self, copy: &BookCopy) -> AppResult<Book> {
        let mut guard = self.tables.lock().await;
        let tables = &mut *guard;

        if tables.copies.contains_key(&copy.id) {
            return Err(AppError::Conflict(format!("Book copy {} already exists", copy.id)));
        }
        let Some(book) = tables.books.get_mut(&copy.book_id) else {
            return Err(AppError::NotFound(format!(
                "Book with id {} not found",
                copy.book_id
            )));
        };

        book.quantity += 1;
        tables.copies.insert(copy.id, copy.clone());
        Ok(book.clone())
    }

    async fn find_copy(&self, id: Uuid) -> AppResult<Option<BookCopy>> {
        Ok(self.tables.lock().await.copies.get(&id).cloned())
    }

    async fn update_copy(&self, copy: &BookCopy) -> AppResult<Option<BookCopy>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.copies.get_mut(&copy.id).map(|stored| {
            stored.barcode = copy.barcode.clone();
            stored.condition = copy.condition.clone();
            stored.clone()
        }))
    }

    async fn delete_copy(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.lock().await;
        if tables.loans.values().any(|l| l.book_copy_id == id) {
            return Err(AppError::Conflict(format!("Book copy {} has loan history", id)));
        }
        Ok(tables.copies.remove(&id).is_some())
    }
}

#[async_trait]
impl PatronStore for MemoryStore {
    async fn save_user(&self, user: &User) -> AppResult<User> {
        let mut tables = self.tables.lock().await;
        if tables.handle_taken(&user.handle, user.id) || tables.users.contains_key(&user.id) {
            return Err(AppError::Conflict(format!(
                "Handle {} already exists",
                user.handle
            )));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn update_user(&self, user: &User) -> AppResult<Option<User>> {
        let mut tables = self.tables.lock().await;
        if tables.handle_taken(&user.handle, user.id) {
            return Err(AppError::Conflict(format!(
                "Handle {} already exists",
                user.handle
            )));
        }
        Ok(tables.users.get_mut(&user.id).map(|stored| {
            stored.student_id = user.student_id.clone();
            stored.handle = user.handle.clone();
            stored.email = user.email.clone();
            stored.password = user.password.clone();
            stored.clone()
        }))
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.lock().await;
        if tables.loans.values().any(|l| l.user_id == id) {
            return Err(AppError::Conflict(format!("User {} has loan history", id)));
        }
        Ok(tables.users.remove(&id).is_some())
    }

    async fn id_by_handle(&self, handle: &str) -> AppResult<Option<Uuid>> {
        Ok(self.tables.lock().await.user_by_handle(handle).map(|u| u.id))
    }

    async fn role_by_handle(&self, handle: &str) -> AppResult<Option<Role>> {
        Ok(self
            .tables
            .lock()
            .await
            .user_by_handle(handle)
            .map(|u| u.role))
    }

    async fn password_hash(&self, handle: &str) -> AppResult<Option<String>> {
        Ok(self
            .tables
            .lock()
            .await
            .user_by_handle(handle)
            .map(|u| u.password.clone()))
    }

    async fn total_fine(&self, id: Uuid) -> AppResult<Option<i64>> {
        Ok(self.tables.lock().await.users.get(&id).map(|u| u.total_fine))
    }
}

#[async_trait]
impl LoanStore for MemoryStore {
    async fn insert(&self, loan: &Loan) -> AppResult<Loan> {
        let mut tables = self.tables.lock().await;
        let taken = tables
            .loans
            .values()
            .any(|l| l.book_copy_id == loan.book_copy_id && l.is_open());
        if taken {
            return Err(AppError::CopyAlreadyBorrowed(loan.book_copy_id));
        }
        tables.loans.insert(loan.id, loan.clone());
        Ok(loan.clone())
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Loan>> {
        Ok(self.tables.lock().await.loans.get(&id).cloned())
    }

    async fn find_open_by_user_and_copy(
        &self,
        user_id: Uuid,
        book_copy_id: Uuid,
    ) -> AppResult<Option<Loan>> {
        Ok(self
            .tables
            .lock()
            .await
            .loans
            .values()
            .find(|l| l.user_id == user_id && l.book_copy_id == book_copy_id && l.is_open())
            .cloned())
    }

    async fn is_open(&self, book_copy_id: Uuid) -> AppResult<bool> {
        Ok(self
            .tables
            .lock()
            .await
            .loans
            .values()
            .any(|l| l.book_copy_id == book_copy_id && l.is_open()))
    }

    async fn close(&self, loan: &Loan) -> AppResult<Option<Loan>> {
        let mut guard = self.tables.lock().await;
        let tables = &mut *guard;

        let Some(stored) = tables.loans.get_mut(&loan.id).filter(|l| l.is_open()) else {
            return Ok(None);
        };
        let Some(user) = tables.users.get_mut(&stored.user_id) else {
            return Err(AppError::Internal(format!(
                "Loan {} references missing user",
                stored.id
            )));
        };

        stored.fine = loan.fine;
        stored.returned_at = loan.returned_at;
        user.total_fine += stored.fine;
        Ok(Some(stored.clone()))
    }
}
