use std::sync::Arc;

use futures::future::join_all;
use mockito::{Matcher, Server, ServerGuard};
use reqwest::StatusCode;
use serde_json::{json, Value};

use stylentu_core::auth::{MemoryStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use stylentu_core::{
    ApiError, ApiRequest, AuthState, AuthenticatedClient, ClientConfig, CredentialStore, FormPart,
    RefreshError, Session,
};

const CATEGORIES: &str = "/get_all_categories/";
const REFRESH: &str = "/auth/refresh-token";

fn client_for(
    server: &ServerGuard,
    store: Arc<MemoryStore>,
) -> AuthenticatedClient<stylentu_core::api::HttpTransport, MemoryStore> {
    let config = ClientConfig {
        base_url: server.url(),
        ..ClientConfig::default()
    };
    AuthenticatedClient::new(&config, store).unwrap()
}

fn logged_in_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::with_entries([
        (ACCESS_TOKEN_KEY, "A1"),
        (REFRESH_TOKEN_KEY, "R1"),
    ]))
}

#[tokio::test]
async fn test_valid_token_is_attached() {
    let mut server = Server::new_async().await;
    let m = server
        .mock("GET", CATEGORIES)
        .match_header("authorization", "Bearer A1")
        .with_status(200)
        .with_body(r#"[{"id": 1, "name": "Shirts"}]"#)
        .expect(1)
        .create_async()
        .await;
    let refresh = server.mock("POST", REFRESH).expect(0).create_async().await;

    let client = client_for(&server, logged_in_store());
    let categories: Vec<Value> = client.get_json(CATEGORIES).await.unwrap();

    m.assert_async().await;
    refresh.assert_async().await;
    assert_eq!(categories[0]["name"], "Shirts");
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_replayed() {
    let mut server = Server::new_async().await;
    let expired = server
        .mock("GET", CATEGORIES)
        .match_header("authorization", "Bearer A1")
        .with_status(401)
        .with_body(r#"{"detail": "Given token not valid for any token type"}"#)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", REFRESH)
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(json!({"token": "R1"})))
        .with_status(200)
        .with_body(r#"{"accessToken": "A2"}"#)
        .expect(1)
        .create_async()
        .await;
    let replay = server
        .mock("GET", CATEGORIES)
        .match_header("authorization", "Bearer A2")
        .with_status(200)
        .with_body(r#"[{"id": 1, "name": "Shirts"}, {"id": 2, "name": "Dresses"}]"#)
        .expect(1)
        .create_async()
        .await;

    let store = logged_in_store();
    let client = client_for(&server, Arc::clone(&store));
    let categories: Vec<Value> = client.get_json(CATEGORIES).await.unwrap();

    expired.assert_async().await;
    refresh.assert_async().await;
    replay.assert_async().await;
    assert_eq!(categories.len(), 2);
    assert_eq!(store.access_token().await.unwrap().as_deref(), Some("A2"));
    assert_eq!(store.refresh_token().await.unwrap().as_deref(), Some("R1"));
}

#[tokio::test]
async fn test_request_without_token_is_sent_bare_and_401_propagates() {
    let mut server = Server::new_async().await;
    let m = server
        .mock("GET", CATEGORIES)
        .match_header("authorization", Matcher::Missing)
        .with_status(401)
        .with_body(r#"{"detail": "Authentication credentials were not provided."}"#)
        .expect(1)
        .create_async()
        .await;
    let refresh = server.mock("POST", REFRESH).expect(0).create_async().await;

    let store = Arc::new(MemoryStore::new());
    let client = client_for(&server, store);
    let err = client.send(ApiRequest::get(CATEGORIES)).await.unwrap_err();

    m.assert_async().await;
    refresh.assert_async().await;
    assert!(err.is_unauthorized());
    assert_eq!(
        err.server_message(),
        Some("Authentication credentials were not provided.")
    );
}

#[tokio::test]
async fn test_replay_rejected_again_is_not_refreshed_twice() {
    let mut server = Server::new_async().await;
    let rejected = server
        .mock("GET", CATEGORIES)
        .with_status(401)
        .expect(2)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", REFRESH)
        .with_status(200)
        .with_body(r#"{"accessToken": "A2"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server, logged_in_store());
    let err = client.send(ApiRequest::get(CATEGORIES)).await.unwrap_err();

    rejected.assert_async().await;
    refresh.assert_async().await;
    assert!(err.is_unauthorized());
    assert_eq!(err.request().unwrap().authorization(), Some("Bearer A2"));
}

#[tokio::test]
async fn test_missing_refresh_token_fails_without_network_call() {
    let mut server = Server::new_async().await;
    let m = server
        .mock("GET", CATEGORIES)
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server.mock("POST", REFRESH).expect(0).create_async().await;

    let store = Arc::new(MemoryStore::with_entries([(ACCESS_TOKEN_KEY, "A1")]));
    let client = client_for(&server, store);
    let err = client.send(ApiRequest::get(CATEGORIES)).await.unwrap_err();

    m.assert_async().await;
    refresh.assert_async().await;
    assert!(matches!(err, ApiError::Refresh(RefreshError::NoRefreshToken)));
}

#[tokio::test]
async fn test_rejected_refresh_replaces_original_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", CATEGORIES)
        .with_status(401)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", REFRESH)
        .with_status(401)
        .with_body(r#"{"detail": "Token is invalid or expired"}"#)
        .expect(1)
        .create_async()
        .await;

    let store = logged_in_store();
    let client = client_for(&server, Arc::clone(&store));
    let err = client.send(ApiRequest::get(CATEGORIES)).await.unwrap_err();

    refresh.assert_async().await;
    assert!(matches!(
        err,
        ApiError::Refresh(RefreshError::Failed {
            status: Some(StatusCode::UNAUTHORIZED),
            ..
        })
    ));
    assert_eq!(store.access_token().await.unwrap().as_deref(), Some("A1"));
}

#[tokio::test]
async fn test_non_auth_errors_pass_through() {
    let mut server = Server::new_async().await;
    let m = server
        .mock("POST", "/delete_dress/")
        .match_body(Matcher::Json(json!({"dress_id": 12})))
        .with_status(500)
        .with_body("Internal Server Error")
        .expect(1)
        .create_async()
        .await;
    let refresh = server.mock("POST", REFRESH).expect(0).create_async().await;

    let client = client_for(&server, logged_in_store());
    let err = client
        .post_json::<_, Value>("/delete_dress/", &json!({"dress_id": 12}))
        .await
        .unwrap_err();

    m.assert_async().await;
    refresh.assert_async().await;
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(err.server_message(), Some("Internal Server Error"));
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let mut server = Server::new_async().await;
    let expired = server
        .mock("GET", CATEGORIES)
        .match_header("authorization", "Bearer A1")
        .with_status(401)
        .expect(3)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", REFRESH)
        .with_status(200)
        .with_body(r#"{"accessToken": "A2"}"#)
        .expect(1)
        .create_async()
        .await;
    let replay = server
        .mock("GET", CATEGORIES)
        .match_header("authorization", "Bearer A2")
        .with_status(200)
        .with_body("[]")
        .expect(3)
        .create_async()
        .await;

    let client = client_for(&server, logged_in_store());
    let results = join_all((0..3).map(|_| client.get_json::<Vec<Value>>(CATEGORIES))).await;

    expired.assert_async().await;
    refresh.assert_async().await;
    replay.assert_async().await;
    assert!(results.iter().all(|r| r.is_ok()));
}

#[tokio::test]
async fn test_multipart_upload_is_replayed_after_refresh() {
    let mut server = Server::new_async().await;
    let form_body = Matcher::AllOf(vec![
        Matcher::Regex(r#"name="color"\r\n\r\nred"#.to_string()),
        Matcher::Regex(r#"name="image"; filename="dress.jpg""#.to_string()),
        Matcher::Regex("jpeg-bytes".to_string()),
    ]);
    let expired = server
        .mock("POST", "/add_dress/")
        .match_header("authorization", "Bearer A1")
        .match_body(form_body.clone())
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", REFRESH)
        .with_status(200)
        .with_body(r#"{"accessToken": "A2"}"#)
        .expect(1)
        .create_async()
        .await;
    let replay = server
        .mock("POST", "/add_dress/")
        .match_header("authorization", "Bearer A2")
        .match_header("content-type", Matcher::Regex("^multipart/form-data".to_string()))
        .match_body(form_body)
        .with_status(201)
        .with_body(r#"{"dress_id": 12}"#)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server, logged_in_store());
    let created: Value = client
        .post_form(
            "/add_dress/",
            vec![
                FormPart::text("color", "red"),
                FormPart::file("image", "dress.jpg", b"jpeg-bytes".to_vec()).mime("image/jpeg"),
            ],
        )
        .await
        .unwrap();

    expired.assert_async().await;
    refresh.assert_async().await;
    replay.assert_async().await;
    assert_eq!(created["dress_id"], 12);
}

#[tokio::test]
async fn test_login_session_then_logout() {
    let mut server = Server::new_async().await;
    let login = server
        .mock("POST", "/auth/login/")
        .match_body(Matcher::Json(json!({"username": "mina", "password": "hunter2"})))
        .with_status(200)
        .with_body(r#"{"access_token": "A1", "refresh_token": "R1"}"#)
        .expect(1)
        .create_async()
        .await;
    let profile = server
        .mock("GET", "/auth/get_user_profile/")
        .match_header("authorization", "Bearer A1")
        .with_status(200)
        .with_body(r#"{"username": "mina"}"#)
        .expect(1)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::new());
    let client = client_for(&server, Arc::clone(&store));
    let session = Session::new(Arc::clone(&store));

    let tokens = client.authenticate("mina", "hunter2").await.unwrap();
    session.login(&tokens).await.unwrap();
    assert_eq!(session.state().await.unwrap(), AuthState::Authenticated);

    let body: Value = client.get_json("/auth/get_user_profile/").await.unwrap();
    assert_eq!(body["username"], "mina");

    session.logout().await.unwrap();
    assert_eq!(session.state().await.unwrap(), AuthState::LoggedOut);

    login.assert_async().await;
    profile.assert_async().await;
}
