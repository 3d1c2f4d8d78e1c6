//! Repository layer.
//!
//! Each entity has an async repository trait, a Postgres implementation
//! holding a pool handle, and an in-memory stand-in in [`crate::memory`].
//! Every store-facing call is bounded by the repository's timeout.

use std::future::Future;
use std::time::Duration;

use crate::error::{RepoResult, StoreError};

pub mod employee_repo;
pub mod role_repo;

pub use employee_repo::{EmployeeRepository, PgEmployeeRepo};
pub use role_repo::{PgRoleRepo, RoleRepository};

/// Default bound for every store-facing call.
pub const DEFAULT_TIMEOUT: Duration = idm_core::config::DEFAULT_QUERY_TIMEOUT;

/// Run `fut`, failing with [`StoreError::Timeout`] once `after` elapses.
///
/// Dropping an in-flight transaction on expiry rolls it back.
pub(crate) async fn timed<T, F>(operation: &'static str, after: Duration, fut: F) -> RepoResult<T>
where
    F: Future<Output = RepoResult<T>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, ?after, "Database call timed out");
            Err(StoreError::Timeout { operation, after }.into())
        }
    }
}
