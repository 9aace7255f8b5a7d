//! Registration, login and project tests against a temporary store

mod common;

use common::temp_storage;
use hoprun_services::{
    AccountService, PROJECT_PAGE_SIZE, PasswordHasher, ProjectService, ServiceError, TokenSigner,
};
use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};
use uuid::Uuid;

fn accounts(storage: hoprun_storage::LocalStorage) -> AccountService {
    AccountService::new(storage, TokenSigner::new(b"test-secret"))
        .with_hasher(PasswordHasher::with_iterations(1_000))
}

#[tokio::test]
async fn register_then_login_issues_valid_token() {
    let (_dir, storage) = temp_storage();
    let service = accounts(storage);

    let user = service.register("ada@example.com", "hunter2").await.unwrap();
    assert_eq!(user.email, "ada@example.com");
    assert_ne!(user.password_hash, "hunter2");

    let token = service.login("ada@example.com", "hunter2").await.unwrap();
    let claims = service.validate_token(&token).unwrap();
    assert_eq!(claims.user_id, user.id);
    assert!(service.user_exists(user.id).await.unwrap());
}

#[tokio::test]
async fn duplicate_email_conflicts_and_keeps_one_row() {
    let (_dir, storage) = temp_storage();
    let service = accounts(storage.clone());

    service.register("ada@example.com", "first").await.unwrap();
    let err = service
        .register("ada@example.com", "second")
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Conflict(_)), "got {err:?}");
    assert_eq!(err.status_code(), 409);
    assert_eq!(storage.count_users_with_email("ada@example.com").unwrap(), 1);

    // The first password still works
    service.login("ada@example.com", "first").await.unwrap();
}

#[tokio::test]
async fn bad_credentials_are_indistinguishable() {
    let (_dir, storage) = temp_storage();
    let service = accounts(storage);
    service.register("ada@example.com", "hunter2").await.unwrap();

    let wrong_password = service
        .login("ada@example.com", "nope")
        .await
        .unwrap_err();
    let unknown_email = service
        .login("bob@example.com", "hunter2")
        .await
        .unwrap_err();

    assert!(matches!(wrong_password, ServiceError::Unauthorized(_)));
    assert!(matches!(unknown_email, ServiceError::Unauthorized(_)));
    assert_eq!(wrong_password.public_message(), unknown_email.public_message());
}

async fn average_login_time(service: &AccountService, email: &str, rounds: u32) -> Duration {
    let start = Instant::now();
    for _ in 0..rounds {
        service.login(email, "wrong").await.unwrap_err();
    }
    start.elapsed() / rounds
}

#[tokio::test]
async fn unknown_email_costs_as_much_as_wrong_password() {
    let (_dir, storage) = temp_storage();
    let service = AccountService::new(storage, TokenSigner::new(b"test-secret"))
        .with_hasher(PasswordHasher::with_iterations(20_000));
    service.register("ada@example.com", "hunter2").await.unwrap();

    let wrong_password = average_login_time(&service, "ada@example.com", 3).await;
    let unknown_email = average_login_time(&service, "bob@example.com", 3).await;

    assert!(
        unknown_email * 3 >= wrong_password,
        "unknown email {unknown_email:?} vs wrong password {wrong_password:?}"
    );
}

#[tokio::test]
async fn register_validates_input() {
    let (_dir, storage) = temp_storage();
    let service = accounts(storage);

    for (email, password) in [("", "pw"), ("not-an-email", "pw"), ("ada@example.com", "")] {
        let err = service.register(email, password).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)), "{email:?}: {err:?}");
    }
}

#[tokio::test]
async fn token_from_other_secret_is_rejected() {
    let (_dir, storage) = temp_storage();
    let service = accounts(storage);
    let foreign = TokenSigner::new(b"someone-else").issue(Uuid::new_v4()).unwrap();

    let err = service.validate_token(&foreign).unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));
}

#[tokio::test]
async fn projects_list_newest_first_and_capped() {
    let (_dir, storage) = temp_storage();
    let user = accounts(storage.clone())
        .register("ada@example.com", "pw")
        .await
        .unwrap();
    let projects = ProjectService::new(storage);

    for i in 0..12 {
        projects
            .create_project(user.id, &format!("project {i}"))
            .await
            .unwrap();
    }

    let listed = projects.list_projects(user.id).await.unwrap();
    assert_eq!(listed.len(), PROJECT_PAGE_SIZE);
    assert_eq!(listed[0].name, "project 11");
    assert_eq!(listed[9].name, "project 2");
    assert!(listed.iter().all(|p| p.user_id == user.id));
}

#[tokio::test]
async fn projects_are_scoped_to_their_owner() {
    let (_dir, storage) = temp_storage();
    let service = accounts(storage.clone());
    let ada = service.register("ada@example.com", "pw").await.unwrap();
    let bob = service.register("bob@example.com", "pw").await.unwrap();
    let projects = ProjectService::new(storage);

    projects.create_project(ada.id, "analytics").await.unwrap();

    assert!(projects.list_projects(bob.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn blank_project_name_is_rejected() {
    let (_dir, storage) = temp_storage();
    let projects = ProjectService::new(storage);

    let err = projects
        .create_project(Uuid::new_v4(), "   ")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}
