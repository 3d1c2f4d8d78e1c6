//! Repository for the `roles` table.

use std::time::Duration;

use async_trait::async_trait;
use idm_core::types::DbId;
use sqlx::PgPool;

use super::{timed, DEFAULT_TIMEOUT};
use crate::error::{RepoError, RepoResult};
use crate::models::role::{CreateRole, Role};

/// Entity label used in errors and logs.
pub const ENTITY: &str = "role";

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, created_at, updated_at";

/// Store access for roles.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn find_by_id(&self, id: DbId) -> RepoResult<Role>;
    async fn find_all(&self) -> RepoResult<Vec<Role>>;
    async fn find_by_ids(&self, ids: &[DbId]) -> RepoResult<Vec<Role>>;
    /// Single-statement insert. Only the `uq_roles_name` constraint guards
    /// against duplicates.
    async fn create(&self, input: &CreateRole) -> RepoResult<Role>;
    async fn remove(&self, id: DbId) -> RepoResult<()>;
    async fn remove_by_ids(&self, ids: &[DbId]) -> RepoResult<()>;
}

/// Postgres-backed [`RoleRepository`].
#[derive(Debug, Clone)]
pub struct PgRoleRepo {
    pool: PgPool,
    timeout: Duration,
}

impl PgRoleRepo {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl RoleRepository for PgRoleRepo {
    async fn find_by_id(&self, id: DbId) -> RepoResult<Role> {
        timed("find role by id", self.timeout, async {
            let query = format!("SELECT {COLUMNS} FROM roles WHERE id = $1");
            sqlx::query_as::<_, Role>(&query)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(RepoError::NotFound { entity: ENTITY, id })
        })
        .await
    }

    async fn find_all(&self) -> RepoResult<Vec<Role>> {
        timed("find all roles", self.timeout, async {
            let query = format!("SELECT {COLUMNS} FROM roles ORDER BY id ASC");
            Ok(sqlx::query_as::<_, Role>(&query).fetch_all(&self.pool).await?)
        })
        .await
    }

    async fn find_by_ids(&self, ids: &[DbId]) -> RepoResult<Vec<Role>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        timed("find roles by ids", self.timeout, async {
            let query = format!("SELECT {COLUMNS} FROM roles WHERE id = ANY($1) ORDER BY id ASC");
            Ok(sqlx::query_as::<_, Role>(&query)
                .bind(ids)
                .fetch_all(&self.pool)
                .await?)
        })
        .await
    }

    async fn create(&self, input: &CreateRole) -> RepoResult<Role> {
        let role = timed("create role", self.timeout, async {
            let query = format!("INSERT INTO roles (name) VALUES ($1) RETURNING {COLUMNS}");
            sqlx::query_as::<_, Role>(&query)
                .bind(&input.name)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| RepoError::from_insert(e, ENTITY, &input.name))
        })
        .await?;
        tracing::info!(id = role.id, name = %role.name, "Role created");
        Ok(role)
    }

    async fn remove(&self, id: DbId) -> RepoResult<()> {
        timed("remove role", self.timeout, async {
            let result = sqlx::query("DELETE FROM roles WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
            tracing::debug!(id, deleted = result.rows_affected(), "Role removed");
            Ok(())
        })
        .await
    }

    async fn remove_by_ids(&self, ids: &[DbId]) -> RepoResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        timed("remove roles by ids", self.timeout, async {
            let result = sqlx::query("DELETE FROM roles WHERE id = ANY($1)")
                .bind(ids)
                .execute(&self.pool)
                .await?;
            tracing::debug!(?ids, deleted = result.rows_affected(), "Roles removed");
            Ok(())
        })
        .await
    }
}
