//! In-memory repository stand-ins.
//!
//! [`MemoryRepo`] keeps rows in a `BTreeMap` behind a `tokio` mutex. A create
//! holds the mutex for the whole transaction, so concurrent creates are
//! serialised. Faults can be injected to drive the failure paths of the
//! create procedure without a database.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use idm_core::types::{DbId, Timestamp};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{RepoError, RepoResult};
use crate::models::employee::{CreateEmployee, Employee};
use crate::models::role::{CreateRole, Role};
use crate::repositories::{employee_repo, role_repo, EmployeeRepository, RoleRepository};
use crate::transaction::{create_unique, NamedInsert, UnitOfWork};

/// A row type the in-memory store can hold.
pub trait MemoryRecord: Clone + Send + Sync + 'static {
    const ENTITY: &'static str;

    fn id(&self) -> DbId;
    fn name(&self) -> &str;
    fn assemble(id: DbId, name: &str, now: Timestamp) -> Self;
}

impl MemoryRecord for Employee {
    const ENTITY: &'static str = employee_repo::ENTITY;

    fn id(&self) -> DbId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn assemble(id: DbId, name: &str, now: Timestamp) -> Self {
        Employee {
            id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl MemoryRecord for Role {
    const ENTITY: &'static str = role_repo::ENTITY;

    fn id(&self) -> DbId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn assemble(id: DbId, name: &str, now: Timestamp) -> Self {
        Role {
            id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Failures to inject into subsequent operations. Stays in effect until
/// replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Faults {
    pub fail_insert: bool,
    pub panic_on_insert: bool,
    pub fail_commit: bool,
    pub fail_rollback: bool,
}

struct Table<R> {
    /// Last id handed out. Like a sequence, it never goes back.
    last_id: DbId,
    rows: BTreeMap<DbId, R>,
    faults: Faults,
}

impl<R: MemoryRecord> Table<R> {
    fn next_row(&mut self, name: &str) -> RepoResult<R> {
        if self.faults.panic_on_insert {
            panic!("injected panic while inserting {} {name:?}", R::ENTITY);
        }
        if self.faults.fail_insert {
            return Err(injected("insert").into());
        }
        self.last_id += 1;
        Ok(R::assemble(self.last_id, name, Utc::now()))
    }
}

fn injected(step: &str) -> sqlx::Error {
    sqlx::Error::Protocol(format!("injected {step} failure"))
}

/// In-memory implementation of the repository traits.
pub struct MemoryRepo<R> {
    table: Arc<Mutex<Table<R>>>,
}

pub type MemoryEmployeeRepo = MemoryRepo<Employee>;
pub type MemoryRoleRepo = MemoryRepo<Role>;

impl<R> Clone for MemoryRepo<R> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
        }
    }
}

impl<R: MemoryRecord> Default for MemoryRepo<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: MemoryRecord> MemoryRepo<R> {
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(Table {
                last_id: 0,
                rows: BTreeMap::new(),
                faults: Faults::default(),
            })),
        }
    }

    /// Replace the active fault set.
    pub async fn inject(&self, faults: Faults) {
        self.table.lock().await.faults = faults;
    }

    /// Insert a row directly, bypassing transactions and faults.
    pub async fn seed(&self, name: &str) -> R {
        let mut table = self.table.lock().await;
        table.last_id += 1;
        let row = R::assemble(table.last_id, name, Utc::now());
        table.rows.insert(row.id(), row.clone());
        row
    }

    /// Number of committed rows.
    pub async fn len(&self) -> usize {
        self.table.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn begin(&self) -> MemoryTx<R> {
        MemoryTx {
            guard: Arc::clone(&self.table).lock_owned().await,
            staged: Vec::new(),
        }
    }

    async fn get(&self, id: DbId) -> RepoResult<R> {
        self.table
            .lock()
            .await
            .rows
            .get(&id)
            .cloned()
            .ok_or(RepoError::NotFound {
                entity: R::ENTITY,
                id,
            })
    }

    async fn all(&self) -> Vec<R> {
        self.table.lock().await.rows.values().cloned().collect()
    }

    async fn some(&self, ids: &[DbId]) -> Vec<R> {
        self.table
            .lock()
            .await
            .rows
            .values()
            .filter(|row| ids.contains(&row.id()))
            .cloned()
            .collect()
    }

    async fn delete(&self, ids: &[DbId]) {
        let mut table = self.table.lock().await;
        for id in ids {
            table.rows.remove(id);
        }
    }

    /// Plain insert guarded only by name uniqueness, like a `UNIQUE`
    /// constraint.
    async fn insert_unchecked(&self, name: &str) -> RepoResult<R> {
        let mut table = self.table.lock().await;
        if table.rows.values().any(|row| row.name() == name) {
            return Err(RepoError::AlreadyExists {
                entity: R::ENTITY,
                name: name.to_string(),
            });
        }
        let row = table.next_row(name)?;
        table.rows.insert(row.id(), row.clone());
        Ok(row)
    }
}

/// A staged transaction holding the table lock until settled.
pub struct MemoryTx<R> {
    guard: OwnedMutexGuard<Table<R>>,
    staged: Vec<R>,
}

#[async_trait]
impl<R: MemoryRecord> UnitOfWork for MemoryTx<R> {
    async fn commit(mut self) -> Result<(), sqlx::Error> {
        if self.guard.faults.fail_commit {
            return Err(injected("commit"));
        }
        for row in std::mem::take(&mut self.staged) {
            self.guard.rows.insert(row.id(), row);
        }
        Ok(())
    }

    async fn rollback(self) -> Result<(), sqlx::Error> {
        if self.guard.faults.fail_rollback {
            return Err(injected("rollback"));
        }
        Ok(())
    }
}

#[async_trait]
impl<R: MemoryRecord> NamedInsert for MemoryTx<R> {
    type Row = R;

    async fn count_by_name(&mut self, name: &str) -> RepoResult<i64> {
        let committed = self.guard.rows.values().filter(|r| r.name() == name).count();
        let staged = self.staged.iter().filter(|r| r.name() == name).count();
        Ok((committed + staged) as i64)
    }

    async fn insert(&mut self, name: &str) -> RepoResult<R> {
        let row = self.guard.next_row(name)?;
        self.staged.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl EmployeeRepository for MemoryEmployeeRepo {
    async fn find_by_id(&self, id: DbId) -> RepoResult<Employee> {
        self.get(id).await
    }

    async fn find_all(&self) -> RepoResult<Vec<Employee>> {
        Ok(self.all().await)
    }

    async fn find_by_ids(&self, ids: &[DbId]) -> RepoResult<Vec<Employee>> {
        Ok(self.some(ids).await)
    }

    async fn create(&self, input: &CreateEmployee) -> RepoResult<Employee> {
        let tx = self.begin().await;
        create_unique(tx, employee_repo::ENTITY, &input.name).await
    }

    async fn remove(&self, id: DbId) -> RepoResult<()> {
        self.delete(&[id]).await;
        Ok(())
    }

    async fn remove_by_ids(&self, ids: &[DbId]) -> RepoResult<()> {
        self.delete(ids).await;
        Ok(())
    }
}

#[async_trait]
impl RoleRepository for MemoryRoleRepo {
    async fn find_by_id(&self, id: DbId) -> RepoResult<Role> {
        self.get(id).await
    }

    async fn find_all(&self) -> RepoResult<Vec<Role>> {
        Ok(self.all().await)
    }

    async fn find_by_ids(&self, ids: &[DbId]) -> RepoResult<Vec<Role>> {
        Ok(self.some(ids).await)
    }

    async fn create(&self, input: &CreateRole) -> RepoResult<Role> {
        self.insert_unchecked(&input.name).await
    }

    async fn remove(&self, id: DbId) -> RepoResult<()> {
        self.delete(&[id]).await;
        Ok(())
    }

    async fn remove_by_ids(&self, ids: &[DbId]) -> RepoResult<()> {
        self.delete(ids).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::error::{StoreError, TransactionError};

    fn john() -> CreateEmployee {
        CreateEmployee::new("John Doe")
    }

    #[tokio::test]
    async fn create_assigns_id_and_timestamps() {
        let repo = MemoryEmployeeRepo::new();
        let first = repo.create(&john()).await.unwrap();
        let second = repo.create(&CreateEmployee::new("Jane Doe")).await.unwrap();

        assert!(first.id > 0);
        assert!(second.id > first.id);
        assert_eq!(first.name, "John Doe");
        assert_eq!(first.created_at, first.updated_at);
        assert_eq!(repo.find_by_id(first.id).await.unwrap(), first);
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected_without_new_row() {
        let repo = MemoryEmployeeRepo::new();
        repo.create(&john()).await.unwrap();

        let err = repo.create(&john()).await.unwrap_err();
        assert_matches!(err, RepoError::AlreadyExists { entity: "employee", ref name } if name == "John Doe");
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn commit_failure_leaves_no_row() {
        let repo = MemoryEmployeeRepo::new();
        repo.inject(Faults {
            fail_commit: true,
            ..Faults::default()
        })
        .await;

        let err = repo.create(&john()).await.unwrap_err();
        assert_matches!(err, RepoError::Transaction(TransactionError::Commit(_)));
        assert!(repo.is_empty().await);
        assert!(repo.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn panic_during_insert_is_recovered() {
        let repo = MemoryEmployeeRepo::new();
        repo.inject(Faults {
            panic_on_insert: true,
            ..Faults::default()
        })
        .await;

        let err = repo.create(&john()).await.unwrap_err();
        assert_matches!(
            err,
            RepoError::Transaction(TransactionError::Panicked { rollback: None, .. })
        );
        assert!(repo.is_empty().await);

        // The table lock was released by the rollback.
        repo.inject(Faults::default()).await;
        repo.create(&john()).await.unwrap();
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn insert_failure_is_a_store_error() {
        let repo = MemoryEmployeeRepo::new();
        repo.inject(Faults {
            fail_insert: true,
            ..Faults::default()
        })
        .await;

        let err = repo.create(&john()).await.unwrap_err();
        assert_matches!(err, RepoError::Store(StoreError::Query(_)));
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn failed_rollback_after_duplicate_keeps_cause() {
        let repo = MemoryEmployeeRepo::new();
        repo.seed("John Doe").await;
        repo.inject(Faults {
            fail_rollback: true,
            ..Faults::default()
        })
        .await;

        let err = repo.create(&john()).await.unwrap_err();
        assert!(err.is_transaction_error());
        assert!(err.is_already_exists());
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn concurrent_duplicates_yield_one_row() {
        let repo = MemoryEmployeeRepo::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.create(&john()).await })
            })
            .collect();

        let mut created = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) if err.is_already_exists() => rejected += 1,
                Err(err) => panic!("unexpected error: {err}"),
            }
        }
        assert_eq!((created, rejected), (1, 7));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn find_by_ids_skips_missing() {
        let repo = MemoryEmployeeRepo::new();
        let a = repo.seed("A").await;
        let b = repo.seed("B").await;
        repo.seed("C").await;

        let found = repo.find_by_ids(&[a.id, b.id, 999]).await.unwrap();
        assert_eq!(found, vec![a, b]);
        assert!(repo.find_by_ids(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn removal_is_idempotent() {
        let repo = MemoryEmployeeRepo::new();
        let a = repo.seed("A").await;

        repo.remove(999).await.unwrap();
        assert_eq!(repo.len().await, 1);

        repo.remove(a.id).await.unwrap();
        repo.remove(a.id).await.unwrap();
        assert_matches!(repo.find_by_id(a.id).await, Err(RepoError::NotFound { id, .. }) if id == a.id);
    }

    #[tokio::test]
    async fn role_duplicate_hits_the_unique_guard() {
        let repo = MemoryRoleRepo::new();
        let admin = repo.create(&CreateRole::new("Admin")).await.unwrap();
        assert_eq!(admin.name, "Admin");

        let err = repo.create(&CreateRole::new("Admin")).await.unwrap_err();
        assert_matches!(err, RepoError::AlreadyExists { entity: "role", .. });
        assert_eq!(repo.len().await, 1);
    }
}
