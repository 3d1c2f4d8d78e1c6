//! Error taxonomy for the repository layer.

use std::time::Duration;

use idm_core::types::DbId;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    #[error("{entity} already exists: {name}")]
    AlreadyExists { entity: &'static str, name: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

/// Failure at the store boundary: transport, syntax, constraint or deadline.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

/// Failure of the transaction machinery itself.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("error creating transaction")]
    Begin(#[source] sqlx::Error),

    #[error("error committing transaction")]
    Commit(#[source] sqlx::Error),

    /// Rolling back after `cause` failed too. Both are kept; `cause` is the
    /// source.
    #[error("error rolling back transaction: {rollback}")]
    Rollback {
        #[source]
        cause: Box<RepoError>,
        rollback: sqlx::Error,
    },

    #[error("transaction panicked: {message}{}", rollback_suffix(.rollback))]
    Panicked {
        message: String,
        rollback: Option<sqlx::Error>,
    },
}

impl TransactionError {
    /// The failure that triggered a rollback, when there was one.
    pub fn cause(&self) -> Option<&RepoError> {
        match self {
            TransactionError::Rollback { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

fn rollback_suffix(rollback: &Option<sqlx::Error>) -> String {
    match rollback {
        Some(err) => format!(" (rollback failed: {err})"),
        None => String::new(),
    }
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        RepoError::Store(StoreError::Query(err))
    }
}

impl RepoError {
    /// Translate an insert failure, turning a `uq_*` unique violation into
    /// [`RepoError::AlreadyExists`].
    pub(crate) fn from_insert(err: sqlx::Error, entity: &'static str, name: &str) -> Self {
        if is_unique_violation(&err) {
            RepoError::AlreadyExists {
                entity,
                name: name.to_string(),
            }
        } else {
            err.into()
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RepoError::NotFound { .. })
    }

    /// True for a duplicate name, including one rejected after a failed
    /// rollback.
    pub fn is_already_exists(&self) -> bool {
        match self {
            RepoError::AlreadyExists { .. } => true,
            RepoError::Transaction(TransactionError::Rollback { cause, .. }) => {
                cause.is_already_exists()
            }
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RepoError::Store(StoreError::Timeout { .. }))
    }

    pub fn is_transaction_error(&self) -> bool {
        matches!(self, RepoError::Transaction(_))
    }
}

/// PostgreSQL unique constraint violation (SQLSTATE 23505) on a constraint
/// following the `uq_` naming convention.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505")
                && db_err.constraint().is_some_and(|c| c.starts_with("uq_"))
        }
        _ => false,
    }
}
