//! Connection management and resolution against a temporary store

mod common;

use common::{temp_storage, test_cipher};
use hoprun_core::TlsMode;
use hoprun_services::{
    AccountService, AddConnection, ConnectionResolver, ConnectionService, PasswordHasher,
    ProjectService, ServiceError, TokenSigner,
};
use hoprun_storage::LocalStorage;
use pretty_assertions::assert_eq;
use uuid::Uuid;

struct Fixture {
    storage: LocalStorage,
    user_id: Uuid,
    project_id: Uuid,
    connections: ConnectionService,
}

async fn fixture(storage: LocalStorage) -> Fixture {
    let user = AccountService::new(storage.clone(), TokenSigner::new(b"secret"))
        .with_hasher(PasswordHasher::with_iterations(1_000))
        .register("ada@example.com", "pw")
        .await
        .unwrap();
    let project = ProjectService::new(storage.clone())
        .create_project(user.id, "analytics")
        .await
        .unwrap();

    Fixture {
        connections: ConnectionService::new(storage.clone(), test_cipher()),
        storage,
        user_id: user.id,
        project_id: project.id,
    }
}

fn shop_db(project_id: Uuid) -> AddConnection {
    AddConnection {
        project_id,
        host: "db.internal".to_string(),
        port: 5432,
        database: "shop".to_string(),
        username: "reader".to_string(),
        password: "s3cret-pw".to_string(),
        ssl_mode: TlsMode::Require,
    }
}

#[tokio::test]
async fn password_is_encrypted_at_rest_and_resolved_in_memory() {
    let (_dir, storage) = temp_storage();
    let f = fixture(storage).await;

    f.connections
        .add_connection(f.user_id, shop_db(f.project_id))
        .await
        .unwrap();

    let stored = f.storage.list_connections(f.project_id).unwrap();
    assert_eq!(stored.len(), 1);
    assert!(!stored[0].encrypted_password.contains("s3cret-pw"));

    let config = f.connections.resolve(f.user_id, f.project_id).await.unwrap();
    assert_eq!(config.host, "db.internal");
    assert_eq!(config.database, "shop");
    assert_eq!(config.password.as_deref(), Some("s3cret-pw"));
    assert_eq!(config.tls_mode, TlsMode::Require);
}

#[tokio::test]
async fn second_connection_hits_the_limit_without_mutation() {
    let (_dir, storage) = temp_storage();
    let f = fixture(storage).await;

    let first = f
        .connections
        .add_connection(f.user_id, shop_db(f.project_id))
        .await
        .unwrap();

    let mut other = shop_db(f.project_id);
    other.host = "other.internal".to_string();
    let err = f
        .connections
        .add_connection(f.user_id, other)
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::LimitReached(_)), "got {err:?}");
    let listed = f
        .connections
        .list_connections(f.user_id, f.project_id)
        .await
        .unwrap();
    assert_eq!(listed, vec![first]);
}

#[tokio::test]
async fn listing_never_exposes_passwords() {
    let (_dir, storage) = temp_storage();
    let f = fixture(storage).await;
    f.connections
        .add_connection(f.user_id, shop_db(f.project_id))
        .await
        .unwrap();

    let listed = f
        .connections
        .list_connections(f.user_id, f.project_id)
        .await
        .unwrap();
    let json = serde_json::to_string(&listed).unwrap();

    assert!(!json.contains("password"));
    assert!(!json.contains("s3cret-pw"));
    assert!(json.contains(r#""db_host":"db.internal""#));
}

#[tokio::test]
async fn other_users_project_is_not_found() {
    let (_dir, storage) = temp_storage();
    let f = fixture(storage).await;
    let stranger = Uuid::new_v4();

    let err = f
        .connections
        .add_connection(stranger, shop_db(f.project_id))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)), "got {err:?}");

    let err = f
        .connections
        .list_connections(stranger, f.project_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn project_without_connection_does_not_resolve() {
    let (_dir, storage) = temp_storage();
    let f = fixture(storage).await;

    let err = f
        .connections
        .resolve(f.user_id, f.project_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn invalid_connection_input_is_rejected() {
    let (_dir, storage) = temp_storage();
    let f = fixture(storage).await;

    let mut no_host = shop_db(f.project_id);
    no_host.host = " ".to_string();
    let mut no_port = shop_db(f.project_id);
    no_port.port = 0;

    for input in [no_host, no_port] {
        let err = f
            .connections
            .add_connection(f.user_id, input)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)), "got {err:?}");
    }
    assert!(f.storage.list_connections(f.project_id).unwrap().is_empty());
}
