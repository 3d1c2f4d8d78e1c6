//! Transaction settlement and the duplicate-checked create procedure.
//!
//! A create runs as `begin -> count by name -> insert -> commit`. Any
//! failure, including a panic inside the body, rolls the transaction back
//! before the error is returned. The procedure is written against
//! [`UnitOfWork`] and [`NamedInsert`] so the Postgres repositories and the
//! in-memory stand-ins share the same state machine.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use sqlx::{Postgres, Transaction};

use crate::error::{RepoError, RepoResult, TransactionError};

/// Something that can be committed or rolled back exactly once.
#[async_trait]
pub trait UnitOfWork: Send + Sized {
    async fn commit(self) -> Result<(), sqlx::Error>;
    async fn rollback(self) -> Result<(), sqlx::Error>;
}

#[async_trait]
impl UnitOfWork for Transaction<'static, Postgres> {
    async fn commit(self) -> Result<(), sqlx::Error> {
        Transaction::commit(self).await
    }

    async fn rollback(self) -> Result<(), sqlx::Error> {
        Transaction::rollback(self).await
    }
}

/// The two statements the create procedure issues inside its transaction.
#[async_trait]
pub trait NamedInsert: UnitOfWork {
    type Row: Send;

    /// Number of live rows already carrying `name`.
    async fn count_by_name(&mut self, name: &str) -> RepoResult<i64>;

    /// Insert a row with `name`, returning it with store-assigned fields.
    async fn insert(&mut self, name: &str) -> RepoResult<Self::Row>;
}

/// Result of running a transaction body under `catch_unwind`.
pub type Outcome<T> = std::thread::Result<RepoResult<T>>;

/// Insert `name` unless a row with that name already exists, then settle
/// the transaction.
///
/// Only the count and insert run under `catch_unwind`. A panic raised by
/// `commit` or `rollback` themselves is not caught and unwinds to the caller.
pub async fn create_unique<U>(mut tx: U, entity: &'static str, name: &str) -> RepoResult<U::Row>
where
    U: NamedInsert,
{
    let outcome = AssertUnwindSafe(check_and_insert(&mut tx, entity, name))
        .catch_unwind()
        .await;
    settle(tx, outcome).await
}

async fn check_and_insert<U>(tx: &mut U, entity: &'static str, name: &str) -> RepoResult<U::Row>
where
    U: NamedInsert,
{
    let existing = tx.count_by_name(name).await?;
    if existing > 0 {
        tracing::warn!(entity, name, existing, "Rejecting duplicate name");
        return Err(RepoError::AlreadyExists {
            entity,
            name: name.to_string(),
        });
    }
    tx.insert(name).await
}

/// Commit on success, otherwise roll back.
///
/// `outcome` is the already-caught result of the body; `commit` and
/// `rollback` are awaited outside any unwind guard.
///
/// - a body error is returned as-is after a clean rollback
/// - a failed rollback is combined with the body error
/// - a panic becomes [`TransactionError::Panicked`]
/// - a failed commit becomes [`TransactionError::Commit`]
pub async fn settle<T, U>(tx: U, outcome: Outcome<T>) -> RepoResult<T>
where
    U: UnitOfWork,
{
    match outcome {
        Ok(Ok(value)) => {
            tx.commit().await.map_err(TransactionError::Commit)?;
            Ok(value)
        }
        Ok(Err(cause)) => match tx.rollback().await {
            Ok(()) => {
                tracing::debug!(error = %cause, "Transaction rolled back");
                Err(cause)
            }
            Err(rollback) => {
                tracing::error!(error = %cause, rollback_error = %rollback, "Rollback failed");
                Err(TransactionError::Rollback {
                    cause: Box::new(cause),
                    rollback,
                }
                .into())
            }
        },
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(panic = %message, "Transaction body panicked, rolling back");
            let rollback = tx.rollback().await.err();
            if let Some(err) = &rollback {
                tracing::error!(rollback_error = %err, "Rollback after panic failed");
            }
            Err(TransactionError::Panicked { message, rollback }.into())
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
