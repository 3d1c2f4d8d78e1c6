//! Repository for the `employees` table.

use std::time::Duration;

use async_trait::async_trait;
use idm_core::types::DbId;
use sqlx::postgres::PgConnection;
use sqlx::{PgPool, Postgres, Transaction};

use super::{timed, DEFAULT_TIMEOUT};
use crate::error::{RepoError, RepoResult, TransactionError};
use crate::models::employee::{CreateEmployee, Employee};
use crate::transaction::{create_unique, NamedInsert, UnitOfWork};

/// Entity label used in errors and logs.
pub const ENTITY: &str = "employee";

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, created_at, updated_at";

/// Store access for employees.
#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    /// Point lookup; a missing row is [`RepoError::NotFound`].
    async fn find_by_id(&self, id: DbId) -> RepoResult<Employee>;

    async fn find_all(&self) -> RepoResult<Vec<Employee>>;

    /// Rows whose id is in `ids`. Unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[DbId]) -> RepoResult<Vec<Employee>>;

    /// Insert inside a transaction after checking the name is free.
    async fn create(&self, input: &CreateEmployee) -> RepoResult<Employee>;

    /// Delete one row. Deleting a missing id is not an error.
    async fn remove(&self, id: DbId) -> RepoResult<()>;

    async fn remove_by_ids(&self, ids: &[DbId]) -> RepoResult<()>;
}

/// Postgres-backed [`EmployeeRepository`].
#[derive(Debug, Clone)]
pub struct PgEmployeeRepo {
    pool: PgPool,
    timeout: Duration,
}

impl PgEmployeeRepo {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl EmployeeRepository for PgEmployeeRepo {
    async fn find_by_id(&self, id: DbId) -> RepoResult<Employee> {
        timed("find employee by id", self.timeout, async {
            let query = format!("SELECT {COLUMNS} FROM employees WHERE id = $1");
            sqlx::query_as::<_, Employee>(&query)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(RepoError::NotFound { entity: ENTITY, id })
        })
        .await
    }

    async fn find_all(&self) -> RepoResult<Vec<Employee>> {
        timed("find all employees", self.timeout, async {
            let query = format!("SELECT {COLUMNS} FROM employees ORDER BY id ASC");
            Ok(sqlx::query_as::<_, Employee>(&query)
                .fetch_all(&self.pool)
                .await?)
        })
        .await
    }

    async fn find_by_ids(&self, ids: &[DbId]) -> RepoResult<Vec<Employee>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        timed("find employees by ids", self.timeout, async {
            let query =
                format!("SELECT {COLUMNS} FROM employees WHERE id = ANY($1) ORDER BY id ASC");
            Ok(sqlx::query_as::<_, Employee>(&query)
                .bind(ids)
                .fetch_all(&self.pool)
                .await?)
        })
        .await
    }

    async fn create(&self, input: &CreateEmployee) -> RepoResult<Employee> {
        let employee = timed("create employee", self.timeout, async {
            let tx = self.pool.begin().await.map_err(TransactionError::Begin)?;
            create_unique(EmployeeTx(tx), ENTITY, &input.name).await
        })
        .await?;
        tracing::info!(id = employee.id, name = %employee.name, "Employee created");
        Ok(employee)
    }

    async fn remove(&self, id: DbId) -> RepoResult<()> {
        timed("remove employee", self.timeout, async {
            let result = sqlx::query("DELETE FROM employees WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
            tracing::debug!(id, deleted = result.rows_affected(), "Employee removed");
            Ok(())
        })
        .await
    }

    async fn remove_by_ids(&self, ids: &[DbId]) -> RepoResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        timed("remove employees by ids", self.timeout, async {
            let result = sqlx::query("DELETE FROM employees WHERE id = ANY($1)")
                .bind(ids)
                .execute(&self.pool)
                .await?;
            tracing::debug!(?ids, deleted = result.rows_affected(), "Employees removed");
            Ok(())
        })
        .await
    }
}

/// An open employee transaction.
struct EmployeeTx(Transaction<'static, Postgres>);

impl EmployeeTx {
    fn conn(&mut self) -> &mut PgConnection {
        &mut self.0
    }
}

#[async_trait]
impl UnitOfWork for EmployeeTx {
    async fn commit(self) -> Result<(), sqlx::Error> {
        UnitOfWork::commit(self.0).await
    }

    async fn rollback(self) -> Result<(), sqlx::Error> {
        UnitOfWork::rollback(self.0).await
    }
}

#[async_trait]
impl NamedInsert for EmployeeTx {
    type Row = Employee;

    async fn count_by_name(&mut self, name: &str) -> RepoResult<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM employees WHERE name = $1")
            .bind(name)
            .fetch_one(self.conn())
            .await?;
        Ok(count.0)
    }

    async fn insert(&mut self, name: &str) -> RepoResult<Employee> {
        let query = format!("INSERT INTO employees (name) VALUES ($1) RETURNING {COLUMNS}");
        sqlx::query_as::<_, Employee>(&query)
            .bind(name)
            .fetch_one(self.conn())
            .await
            .map_err(|e| RepoError::from_insert(e, ENTITY, name))
    }
}
