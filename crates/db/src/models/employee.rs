//! Employee entity model and DTOs.

use idm_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `employees` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Employee {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new employee. The store assigns everything else.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateEmployee {
    pub name: String,
}

impl CreateEmployee {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
