//! Employee service.

use idm_core::types::DbId;
use idm_db::models::employee::CreateEmployee;
use idm_db::repositories::employee_repo::ENTITY;
use idm_db::repositories::EmployeeRepository;
use idm_db::RepoResult;

use crate::dto::EmployeeResponse;
use crate::error::{ServiceError, ServiceResult};

pub struct EmployeeService<R> {
    repo: R,
}

impl<R: EmployeeRepository> EmployeeService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub async fn create(&self, name: &str) -> ServiceResult<EmployeeResponse> {
        let employee = self
            .repo
            .create(&CreateEmployee::new(name))
            .await
            .map_err(|source| {
                tracing::debug!(name, error = %source, "Employee create failed");
                ServiceError::Create {
                    entity: ENTITY,
                    name: name.to_string(),
                    source,
                }
            })?;
        Ok(employee.into())
    }

    pub async fn find_by_id(&self, id: DbId) -> ServiceResult<EmployeeResponse> {
        let employee = self
            .repo
            .find_by_id(id)
            .await
            .map_err(|source| ServiceError::FindById {
                entity: ENTITY,
                id,
                source,
            })?;
        Ok(employee.into())
    }

    pub async fn find_all(&self) -> ServiceResult<Vec<EmployeeResponse>> {
        let employees = self
            .repo
            .find_all()
            .await
            .map_err(|source| ServiceError::FindAll {
                entity: ENTITY,
                source,
            })?;
        Ok(employees.into_iter().map(Into::into).collect())
    }

    pub async fn find_by_ids(&self, ids: &[DbId]) -> ServiceResult<Vec<EmployeeResponse>> {
        let employees = self
            .repo
            .find_by_ids(ids)
            .await
            .map_err(|source| ServiceError::FindByIds {
                entity: ENTITY,
                ids: ids.to_vec(),
                source,
            })?;
        Ok(employees.into_iter().map(Into::into).collect())
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
