//! Team listing and registration over HTTP.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use crm_client::{
    ApiClient, ApiError, AuthGuard, CrmError, NewUserForm, SessionStore, TeamError, TeamQuery,
    TeamService,
};
use crm_core::{Email, Identity, Role, UserId};
use crm_integration_tests::{MockAuthority, VerifyBehavior, seed};
use secrecy::ExposeSecret;

fn api(mock: &MockAuthority) -> ApiClient {
    ApiClient::new(&mock.api_config().unwrap()).unwrap()
}

fn form(email: &str, role: Role) -> NewUserForm {
    NewUserForm {
        name: "Jane Agent".to_string(),
        email: email.to_string(),
        phone_number: "0712345678".to_string(),
        gender: "Female".to_string(),
        role: Some(role),
        supervisor: Some("Sam Supervisor".to_string()),
    }
}

#[tokio::test]
async fn test_list_maps_records() {
    let mock = MockAuthority::start().await.unwrap();
    let api = api(&mock);

    let page = TeamService::new(&api)
        .list(&TeamQuery::default())
        .await
        .unwrap();

    assert_eq!(page.total, 5);
    assert_eq!(page.members[0].name, "Demo User");
    assert_eq!(page.members[0].role, Role::Manager);
    assert_eq!(page.members[0].supervisor, "-");
    assert_eq!(page.members[4].supervisor, "Sam Supervisor");
}

#[tokio::test]
async fn test_list_filters_and_pages() {
    let mock = MockAuthority::start_empty().await.unwrap();
    for i in 1..=23 {
        let role = if i % 3 == 0 { "Supervisor" } else { "Agent" };
        mock.add_user(
            seed(&i.to_string(), &format!("User {i}"), &format!("user{i}@crm.test"), role, None),
            "pw",
        );
    }
    let api = api(&mock);
    let team = TeamService::new(&api);

    let supervisors = team
        .list(&TeamQuery {
            role: Some(Role::Supervisor),
            per_page: 5,
            ..TeamQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(supervisors.total, 7);
    assert_eq!(supervisors.total_pages, 2);
    assert_eq!(supervisors.members.len(), 5);

    let past_end = team
        .list(&TeamQuery {
            page: 4,
            ..TeamQuery::default()
        })
        .await
        .unwrap();
    assert!(past_end.members.is_empty());
    assert_eq!(past_end.total, 23);

    let search = team
        .list(&TeamQuery {
            search: Some("USER2".to_string()),
            ..TeamQuery::default()
        })
        .await
        .unwrap();
    // user2, user20..user23
    assert_eq!(search.total, 5);
}

#[tokio::test]
async fn test_listing_failure_is_malformed() {
    let mock = MockAuthority::start().await.unwrap();
    mock.fail_user_listing(true);
    let api = api(&mock);

    let err = TeamService::new(&api)
        .list(&TeamQuery::default())
        .await
        .unwrap_err();

    assert!(matches!(err, TeamError::Api(ApiError::Malformed(_))));
    assert!(matches!(CrmError::from(err), CrmError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_register_returns_temporary_password() {
    let mock = MockAuthority::start().await.unwrap();
    let api = api(&mock);

    let created = TeamService::new(&api)
        .register(Role::Manager, &form("jane@crm.test", Role::Agent))
        .await
        .unwrap();

    assert_eq!(created.user.email, "jane@crm.test");
    assert_eq!(created.user.role(), Role::Agent);
    assert_eq!(created.temporary_password.expose_secret().len(), 12);
    assert_eq!(mock.users().len(), 6);
}

#[tokio::test]
async fn test_duplicate_email_is_rejected_with_message() {
    let mock = MockAuthority::start().await.unwrap();
    let api = api(&mock);

    let err = TeamService::new(&api)
        .register(Role::Admin, &form("demo@gmail.com", Role::Agent))
        .await
        .unwrap_err();

    match err {
        TeamError::Api(ApiError::Rejected(message)) => {
            assert_eq!(message, "Email already registered");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(mock.users().len(), 5);
}

#[tokio::test]
async fn test_invalid_form_sends_nothing() {
    let mock = MockAuthority::start().await.unwrap();
    let api = api(&mock);
    let team = TeamService::new(&api);

    let mut no_supervisor = form("new@crm.test", Role::SalesAgent);
    no_supervisor.supervisor = None;
    assert!(matches!(
        team.register(Role::Manager, &no_supervisor).await,
        Err(TeamError::SupervisorRequired(Role::SalesAgent))
    ));

    assert!(matches!(
        team.register(Role::Supervisor, &form("new@crm.test", Role::Manager))
            .await,
        Err(TeamError::RoleNotAssignable { .. })
    ));

    assert_eq!(mock.users().len(), 5);
}

async fn session_as(role: Role) -> SessionStore {
    let store = SessionStore::in_memory();
    store
        .save(Identity {
            user_id: UserId::new("5"),
            name: "Andy Agent".to_string(),
            email: Email::parse("agent@gmail.com").unwrap(),
            role,
            phone_number: "0700000005".to_string(),
            gender: "Unspecified".to_string(),
            supervisor: None,
        })
        .await
        .unwrap();
    store
}

#[tokio::test]
async fn test_registrar_role_comes_from_confirmed_session() {
    let mock = MockAuthority::start().await.unwrap();
    let api = api(&mock);
    let store = session_as(Role::Manager).await;

    let registrar = AuthGuard::new(api.clone(), &store)
        .authorize("RegisterUser")
        .await
        .unwrap()
        .role();
    TeamService::new(&api)
        .register(registrar, &form("jane@crm.test", Role::Agent))
        .await
        .unwrap();

    assert_eq!(mock.verify_calls(), 1);
    assert_eq!(mock.users().len(), 6);
}

#[tokio::test]
async fn test_unconfirmed_session_cannot_register() {
    let mock = MockAuthority::start().await.unwrap();
    mock.set_verify(VerifyBehavior::Invalid);
    let api = api(&mock);
    // Edited locally to claim a role the account never had
    let store = session_as(Role::Admin).await;

    let session = AuthGuard::new(api.clone(), &store)
        .authorize("RegisterUser")
        .await;

    assert!(session.is_none());
    assert!(store.load().await.is_none());
    assert_eq!(mock.verify_calls(), 1);
    assert_eq!(mock.users().len(), 5);
}
