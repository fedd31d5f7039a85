//! Data models for the library server

pub mod book;
pub mod book_copy;
pub mod loan;
pub mod user;

// Re-export commonly used types
pub use book::Book;
pub use book_copy::BookCopy;
pub use loan::{Loan, LoanRules, LoanState};
pub use user::{Role, User};
