//! Repository layer for database operations
//!
//! Each store is a trait so the services can run against PostgreSQL, the
//! in-process store, or a mock.

pub mod books;
pub mod loans;
pub mod memory;
pub mod users;

use std::sync::Arc;

use sqlx::{Pool, Postgres};

pub use books::CatalogStore;
pub use loans::LoanStore;
pub use memory::MemoryStore;
pub use users::PatronStore;

/// Main repository struct holding every store
#[derive(Clone)]
pub struct Repository {
    pub catalog: Arc<dyn CatalogStore>,
    pub patrons: Arc<dyn PatronStore>,
    pub loans: Arc<dyn LoanStore>,
}

impl Repository {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        patrons: Arc<dyn PatronStore>,
        loans: Arc<dyn LoanStore>,
    ) -> Self {
        Self {
            catalog,
            patrons,
            loans,
        }
    }

    /// Create a repository backed by the given database pool
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            catalog: Arc::new(books::BooksRepository::new(pool.clone())),
            patrons: Arc::new(users::UsersRepository::new(pool.clone())),
            loans: Arc::new(loans::LoansRepository::new(pool)),
        }
    }

    /// Create a repository whose stores share one in-process state
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            catalog: store.clone(),
            patrons: store.clone(),
            loans: store,
        }
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_foreign_key_violation())
        .unwrap_or(false)
}
