//! Integration tests for the role repository.

use assert_matches::assert_matches;
use idm_db::models::role::CreateRole;
use idm_db::repositories::{PgRoleRepo, RoleRepository};
use idm_db::RepoError;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_and_find(pool: PgPool) {
    let repo = PgRoleRepo::new(pool);

    let role = repo.create(&CreateRole::new("Admin")).await.unwrap();
    assert!(role.id > 0);
    assert_eq!(role.name, "Admin");
    assert!(role.created_at.timestamp() > 0);

    let found = repo.find_by_id(role.id).await.unwrap();
    assert_eq!(found, role);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_rejected_by_constraint(pool: PgPool) {
    let repo = PgRoleRepo::new(pool.clone());
    repo.create(&CreateRole::new("Admin")).await.unwrap();

    let err = repo.create(&CreateRole::new("Admin")).await.unwrap_err();
    assert_matches!(err, RepoError::AlreadyExists { entity: "role", .. });

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM roles")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count.0, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_find_all_and_by_ids(pool: PgPool) {
    let repo = PgRoleRepo::new(pool);

    let admin = repo.create(&CreateRole::new("Admin")).await.unwrap();
    let user = repo.create(&CreateRole::new("User")).await.unwrap();
    let guest = repo.create(&CreateRole::new("Guest")).await.unwrap();

    let all = repo.find_all().await.unwrap();
    assert_eq!(all, vec![admin.clone(), user.clone(), guest]);

    let some = repo.find_by_ids(&[admin.id, user.id]).await.unwrap();
    assert_eq!(some.len(), 2);
    assert!(some.contains(&admin));
    assert!(some.contains(&user));

    assert!(repo.find_by_ids(&[]).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_remove_and_remove_by_ids(pool: PgPool) {
    let repo = PgRoleRepo::new(pool);

    let admin = repo.create(&CreateRole::new("Admin")).await.unwrap();
    let user = repo.create(&CreateRole::new("User")).await.unwrap();
    let guest = repo.create(&CreateRole::new("Guest")).await.unwrap();

    repo.remove(admin.id).await.unwrap();
    assert_matches!(
        repo.find_by_id(admin.id).await,
        Err(RepoError::NotFound { entity: "role", .. })
    );
    repo.remove(admin.id).await.unwrap();

    repo.remove_by_ids(&[user.id, guest.id]).await.unwrap();
    assert!(repo.find_all().await.unwrap().is_empty());
}
