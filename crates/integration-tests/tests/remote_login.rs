//! Login against the remote directory.

#![allow(clippy::unwrap_used)]

use crm_client::{ApiClient, LoginError, LoginFlow, RemoteDirectory, SessionStore};
use crm_core::Role;
use crm_integration_tests::{MockAuthority, SEED_PASSWORD};
use secrecy::SecretString;

fn directory(mock: &MockAuthority) -> RemoteDirectory {
    RemoteDirectory::new(ApiClient::new(&mock.api_config().unwrap()).unwrap())
}

fn password(s: &str) -> SecretString {
    SecretString::from(s)
}

#[tokio::test]
async fn test_remote_login_saves_session() {
    let mock = MockAuthority::start().await.unwrap();
    let store = SessionStore::in_memory();
    let flow = LoginFlow::new(directory(&mock), &store);

    let success = flow
        .submit("demo@gmail.com", &password(SEED_PASSWORD))
        .await
        .unwrap();

    assert_eq!(success.session.role(), Role::Manager);
    assert_eq!(success.session.identity.name, "Demo User");
    assert_eq!(success.destination, "/dashboard");
    assert_eq!(store.load().await, Some(success.session));
}

#[tokio::test]
async fn test_remote_login_routes_each_role() {
    let mock = MockAuthority::start().await.unwrap();
    let cases = [
        ("admin@gmail.com", Role::Admin, "/admin"),
        ("supervisor@gmail.com", Role::Supervisor, "/dashboard"),
        ("sales@gmail.com", Role::SalesAgent, "/dashboard"),
        ("agent@gmail.com", Role::Agent, "/dashboard"),
    ];

    for (email, role, destination) in cases {
        let store = SessionStore::in_memory();
        let flow = LoginFlow::new(directory(&mock), &store);
        let success = flow.submit(email, &password(SEED_PASSWORD)).await.unwrap();
        assert_eq!(success.session.role(), role, "{email}");
        assert_eq!(success.destination, destination, "{email}");
    }
}

#[tokio::test]
async fn test_unrecognized_remote_role_lands_home() {
    let mock = MockAuthority::start_empty().await.unwrap();
    mock.add_user(
        crm_integration_tests::seed("9", "Ivy Intern", "ivy@crm.test", "Intern", None),
        "pw",
    );
    let store = SessionStore::in_memory();
    let flow = LoginFlow::new(directory(&mock), &store);

    let success = flow.submit("ivy@crm.test", &password("pw")).await.unwrap();

    assert_eq!(success.session.role(), Role::Unrecognized);
    assert_eq!(success.destination, "/");
}

#[tokio::test]
async fn test_email_is_normalized() {
    let mock = MockAuthority::start().await.unwrap();
    let store = SessionStore::in_memory();
    let flow = LoginFlow::new(directory(&mock), &store);

    let success = flow
        .submit("  Demo@Gmail.COM ", &password(SEED_PASSWORD))
        .await
        .unwrap();
    assert_eq!(success.session.identity.email.as_str(), "demo@gmail.com");
}

#[tokio::test]
async fn test_unknown_account_leaves_store_empty() {
    let mock = MockAuthority::start().await.unwrap();
    let store = SessionStore::in_memory();
    let flow = LoginFlow::new(directory(&mock), &store);

    let err = flow
        .submit("nobody@x.com", &password("x"))
        .await
        .unwrap_err();

    assert!(matches!(err, LoginError::UnknownAccount));
    assert!(store.load().await.is_none());
}

#[tokio::test]
async fn test_wrong_password_leaves_store_empty() {
    let mock = MockAuthority::start().await.unwrap();
    let store = SessionStore::in_memory();
    let flow = LoginFlow::new(directory(&mock), &store);

    let err = flow
        .submit("demo@gmail.com", &password("wrong"))
        .await
        .unwrap_err();

    assert!(matches!(err, LoginError::InvalidCredential));
    assert!(store.load().await.is_none());
}

#[tokio::test]
async fn test_invalid_email_never_reaches_authority() {
    let mock = MockAuthority::start().await.unwrap();
    let store = SessionStore::in_memory();
    let flow = LoginFlow::new(directory(&mock), &store);

    let err = flow.submit("demo", &password("x")).await.unwrap_err();

    assert!(matches!(err, LoginError::InvalidEmail(_)));
    assert_eq!(mock.login_calls(), 0);
}

#[tokio::test]
async fn test_session_survives_restart_and_verifies() {
    use crm_client::guard::{AuthGuard, Verdict};
    use crm_client::FileStorage;

    let mock = MockAuthority::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    {
        let store = SessionStore::new(FileStorage::new(&path));
        let flow = LoginFlow::new(directory(&mock), &store);
        flow.submit("agent@gmail.com", &password(SEED_PASSWORD))
            .await
            .unwrap();
    }

    let reopened = SessionStore::new(FileStorage::new(&path));
    let session = reopened.load().await.unwrap();
    assert_eq!(session.role(), Role::Agent);
    assert_eq!(session.identity.supervisor.as_deref(), Some("Sam Supervisor"));

    let api = ApiClient::new(&mock.api_config().unwrap()).unwrap();
    let guard = AuthGuard::new(api, &reopened);
    assert_eq!(guard.verify().await, Verdict::Authenticated);
}
