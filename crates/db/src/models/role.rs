//! Role entity model and DTOs.

use idm_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `roles` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Role {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new role.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateRole {
    pub name: String,
}

impl CreateRole {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
