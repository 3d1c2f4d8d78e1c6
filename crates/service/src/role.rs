//! Role service.

use idm_core::types::DbId;
use idm_db::models::role::CreateRole;
use idm_db::repositories::role_repo::ENTITY;
use idm_db::repositories::RoleRepository;
use idm_db::RepoResult;

use crate::dto::RoleResponse;
use crate::error::{ServiceError, ServiceResult};

pub struct RoleService<R> {
    repo: R,
}

impl<R: RoleRepository> RoleService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub async fn create(&self, name: &str) -> ServiceResult<RoleResponse> {
        let role = self
            .repo
            .create(&CreateRole::new(name))
            .await
            .map_err(|source| {
                tracing::debug!(name, error = %source, "Role create failed");
                ServiceError::Create {
                    entity: ENTITY,
                    name: name.to_string(),
                    source,
                }
            })?;
        Ok(role.into())
    }

    pub async fn find_by_id(&self, id: DbId) -> ServiceResult<RoleResponse> {
        let role = self
            .repo
            .find_by_id(id)
            .await
            .map_err(|source| ServiceError::FindById {
                entity: ENTITY,
                id,
                source,
            })?;
        Ok(role.into())
    }

    pub async fn find_all(&self) -> ServiceResult<Vec<RoleResponse>> {
        let roles = self
            .repo
            .find_all()
            .await
            .map_err(|source| ServiceError::FindAll {
                entity: ENTITY,
                source,
            })?;
        Ok(roles.into_iter().map(Into::into).collect())
    }

    pub async fn find_by_ids(&self, ids: &[DbId]) -> ServiceResult<Vec<RoleResponse>> {
        let roles = self
            .repo
            .find_by_ids(ids)
            .await
            .map_err(|source| ServiceError::FindByIds {
                entity: ENTITY,
                ids: ids.to_vec(),
                source,
            })?;
        Ok(roles.into_iter().map(Into::into).collect())
    }

    /// Errors are returned unwrapped.
    pub async fn remove(&self, id: DbId) -> RepoResult<()> {
        self.repo.remove(id).await
    }

    /// Errors are returned unwrapped.
    pub async fn remove_by_ids(&self, ids: &[DbId]) -> RepoResult<()> {
        self.repo.remove_by_ids(ids).await
    }
}
