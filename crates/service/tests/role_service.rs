use assert_matches::assert_matches;
use async_trait::async_trait;
use idm_core::types::DbId;
use idm_db::memory::{Faults, MemoryRoleRepo};
use idm_db::models::role::{CreateRole, Role};
use idm_db::repositories::RoleRepository;
use idm_db::{RepoError, RepoResult, StoreError};
use idm_service::{RoleService, ServiceError};

/// Every call fails with a timeout.
struct StalledRepo;

fn stalled(operation: &'static str) -> RepoError {
    StoreError::Timeout {
        operation,
        after: std::time::Duration::from_secs(3),
    }
    .into()
}

#[async_trait]
impl RoleRepository for StalledRepo {
    async fn find_by_id(&self, _id: DbId) -> RepoResult<Role> {
        Err(stalled("find role by id"))
    }

    async fn find_all(&self) -> RepoResult<Vec<Role>> {
        Err(stalled("find all roles"))
    }

    async fn find_by_ids(&self, _ids: &[DbId]) -> RepoResult<Vec<Role>> {
        Err(stalled("find roles by ids"))
    }

    async fn create(&self, _input: &CreateRole) -> RepoResult<Role> {
        Err(stalled("create role"))
    }

    async fn remove(&self, _id: DbId) -> RepoResult<()> {
        Err(stalled("remove role"))
    }

    async fn remove_by_ids(&self, _ids: &[DbId]) -> RepoResult<()> {
        Err(stalled("remove roles by ids"))
    }
}

#[tokio::test]
async fn create_and_list_roles() {
    let service = RoleService::new(MemoryRoleRepo::new());

    let admin = service.create("Admin").await.unwrap();
    let viewer = service.create("Viewer").await.unwrap();
    assert_ne!(admin.id, viewer.id);

    let all = service.find_all().await.unwrap();
    assert_eq!(all, vec![admin.clone(), viewer]);
    assert_eq!(service.find_by_id(admin.id).await.unwrap(), admin);
}

#[tokio::test]
async fn duplicate_role_is_already_exists() {
    let repo = MemoryRoleRepo::new();
    repo.seed("Admin").await;
    let service = RoleService::new(repo.clone());

    let err = service.create("Admin").await.unwrap_err();
    assert!(err.is_already_exists());
    assert_eq!(
        err.to_string(),
        "error creating role \"Admin\": role already exists: Admin"
    );
    assert_eq!(repo.len().await, 1);
}

#[tokio::test]
async fn missing_role_is_wrapped_not_found() {
    let service = RoleService::new(MemoryRoleRepo::new());

    let err = service.find_by_id(7).await.unwrap_err();
    assert!(err.is_not_found());
    assert_matches!(err, ServiceError::FindById { entity: "role", id: 7, .. });
}

#[tokio::test]
async fn insert_failure_is_wrapped_store_error() {
    let repo = MemoryRoleRepo::new();
    repo.inject(Faults {
        fail_insert: true,
        ..Faults::default()
    })
    .await;
    let service = RoleService::new(repo);

    let err = service.create("Admin").await.unwrap_err();
    assert!(err.to_string().starts_with("error creating role \"Admin\": "));
    assert_matches!(err.into_repo_error(), RepoError::Store(StoreError::Query(_)));
}

#[tokio::test]
async fn remove_roles() {
    let service = RoleService::new(MemoryRoleRepo::new());
    let a = service.create("A").await.unwrap();
    let b = service.create("B").await.unwrap();
    let c = service.create("C").await.unwrap();

    service.remove(a.id).await.unwrap();
    service.remove_by_ids(&[b.id, 999]).await.unwrap();

    let left = service.find_by_ids(&[a.id, b.id, c.id]).await.unwrap();
    assert_eq!(left, vec![c]);
}

#[tokio::test]
async fn remove_errors_are_not_wrapped() {
    let service = RoleService::new(StalledRepo);

    let err = service.remove(1).await.unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(err.to_string(), "remove role timed out after 3s");

    let err = service.remove_by_ids(&[1, 2]).await.unwrap_err();
    assert_matches!(
        err,
        RepoError::Store(StoreError::Timeout { operation: "remove roles by ids", .. })
    );

    // Lookups on the same repo do get context.
    let err = service.find_all().await.unwrap_err();
    assert!(err.to_string().starts_with("error finding all roles: "), "{err}");
    assert!(err.repo_error().is_timeout());
}
