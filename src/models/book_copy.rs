//! Book copy (physical copy) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Full book copy model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookCopy {
    pub id: Uuid,
    pub book_id: Uuid,
    pub barcode: String,
    /// Free-text physical condition ("Good", "Repaired", ...)
    pub condition: String,
    pub added_at: DateTime<Utc>,
}

/// Create book copy request. The parent book comes from the URL path.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateBookCopy {
    #[serde(default)]
    pub barcode: String,
    #[serde(default)]
    pub condition: String,
}

/// Update book copy request
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateBookCopy {
    pub barcode: Option<String>,
    pub condition: Option<String>,
}

impl BookCopy {
    pub fn new(book_id: Uuid, request: CreateBookCopy, added_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            book_id,
            barcode: request.barcode,
            condition: request.condition,
            added_at,
        }
    }

    pub fn apply(&mut self, update: UpdateBookCopy) {
        if let Some(barcode) = update.barcode {
            self.barcode = barcode;
        }
        if let Some(condition) = update.condition {
            self.condition = condition;
        }
    }
}
