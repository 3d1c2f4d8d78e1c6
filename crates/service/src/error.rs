use idm_core::types::DbId;
use idm_db::RepoError;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// A repository failure annotated with the operation that hit it.
///
/// The wrapped [`RepoError`] is the `source()` of every variant.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("error creating {entity} {name:?}: {source}")]
    Create {
        entity: &'static str,
        name: String,
        source: RepoError,
    },

    #[error("error finding {entity} with id {id}: {source}")]
    FindById {
        entity: &'static str,
        id: DbId,
        source: RepoError,
    },

    #[error("error finding all {entity}s: {source}")]
    FindAll {
        entity: &'static str,
        source: RepoError,
    },

    #[error("error finding {entity}s with ids {ids:?}: {source}")]
    FindByIds {
        entity: &'static str,
        ids: Vec<DbId>,
        source: RepoError,
    },
}

impl ServiceError {
    pub fn repo_error(&self) -> &RepoError {
        match self {
            ServiceError::Create { source, .. }
            | ServiceError::FindById { source, .. }
            | ServiceError::FindAll { source, .. }
            | ServiceError::FindByIds { source, .. } => source,
        }
    }

    pub fn into_repo_error(self) -> RepoError {
        match self {
            ServiceError::Create { source, .. }
            | ServiceError::FindById { source, .. }
            | ServiceError::FindAll { source, .. }
            | ServiceError::FindByIds { source, .. } => source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.repo_error().is_not_found()
    }

    pub fn is_already_exists(&self) -> bool {
        self.repo_error().is_already_exists()
    }
}
