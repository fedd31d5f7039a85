//! Book (catalog title) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Full book model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub publisher: String,
    pub year_published: i32,
    pub call_number: String,
    pub cover_picture: String,
    pub isbn: String,
    #[sqlx(rename = "book_collation")]
    pub collation: String,
    pub edition: i32,
    pub description: String,
    pub loc_classification: String,
    pub subjects: Vec<String>,
    pub authors: Vec<String>,
    /// Number of copies ever registered for this title
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
}

/// Create book request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub year_published: i32,
    #[serde(default)]
    pub call_number: String,
    #[serde(default)]
    pub cover_picture: String,
    #[serde(default)]
    pub isbn: String,
    #[serde(default)]
    pub collation: String,
    #[serde(default)]
    pub edition: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub loc_classification: String,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub authors: Vec<String>,
}

/// Update book request; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    pub publisher: Option<String>,
    pub year_published: Option<i32>,
    pub call_number: Option<String>,
    pub cover_picture: Option<String>,
    pub isbn: Option<String>,
    pub collation: Option<String>,
    pub edition: Option<i32>,
    pub description: Option<String>,
    pub loc_classification: Option<String>,
    pub subjects: Option<Vec<String>>,
    pub authors: Option<Vec<String>>,
}

impl Book {
    /// New catalog title with no copies yet
    pub fn new(request: CreateBook, added_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: request.title,
            publisher: request.publisher,
            year_published: request.year_published,
            call_number: request.call_number,
            cover_picture: request.cover_picture,
            isbn: request.isbn,
            collation: request.collation,
            edition: request.edition,
            description: request.description,
            loc_classification: request.loc_classification,
            subjects: request.subjects,
            authors: request.authors,
            quantity: 0,
            added_at,
        }
    }

    /// Apply an update. Quantity only moves when a copy is registered.
    pub fn apply(&mut self, update: UpdateBook) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(publisher) = update.publisher {
            self.publisher = publisher;
        }
        if let Some(year) = update.year_published {
            self.year_published = year;
        }
        if let Some(call_number) = update.call_number {
            self.call_number = call_number;
        }
        if let Some(cover) = update.cover_picture {
            self.cover_picture = cover;
        }
        if let Some(isbn) = update.isbn {
            self.isbn = isbn;
        }
        if let Some(collation) = update.collation {
            self.collation = collation;
        }
        if let Some(edition) = update.edition {
            self.edition = edition;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(classification) = update.loc_classification {
            self.loc_classification = classification;
        }
        if let Some(subjects) = update.subjects {
            self.subjects = subjects;
        }
        if let Some(authors) = update.authors {
            self.authors = authors;
        }
    }
}
