//! Identifier and timestamp types shared by every entity.

/// Row id handed out by the `BIGSERIAL` sequence of `employees` and `roles`.
pub type DbId = i64;

/// `created_at` / `updated_at` as stored in `TIMESTAMPTZ` columns.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
