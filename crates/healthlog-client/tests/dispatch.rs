//! Mock backend tests for authenticated dispatch.
//!
//! These tests use wiremock to simulate the healthlog backend and check the
//! bearer header, the refresh-once recovery path and the error mapping.

use std::sync::Arc;
use std::time::Duration;

use healthlog_client::{ApiRequest, AuthClient, ClientConfig, RefreshMode};
use healthlog_core::{
    AccessToken, ApiUrl, Error, MemorySessionStore, RefreshToken, SessionData, SessionStore,
    StoreError, TransportError, UserProfile,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_api_url(server: &MockServer) -> ApiUrl {
    ApiUrl::new(server.uri()).unwrap()
}

fn session(access: &str, refresh: Option<&str>) -> SessionData {
    SessionData::new(AccessToken::new(access), refresh.map(RefreshToken::new))
}

/// Build a client over an in-memory store, returning the store for inspection.
fn client_with(
    config: ClientConfig,
    session: Option<SessionData>,
) -> (AuthClient, Arc<MemorySessionStore>) {
    let store = Arc::new(match session {
        Some(session) => MemorySessionStore::with_session(session),
        None => MemorySessionStore::new(),
    });
    let shared: Arc<dyn SessionStore> = store.clone();
    let client = AuthClient::new(config, shared).unwrap();
    (client, store)
}

fn client_for(
    server: &MockServer,
    session: Option<SessionData>,
) -> (AuthClient, Arc<MemorySessionStore>) {
    client_with(ClientConfig::new(mock_api_url(server)), session)
}

async fn mount_refresh(
    server: &MockServer,
    refresh_token: &str,
    response: ResponseTemplate,
    times: u64,
) {
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({ "refresh_token": refresh_token })))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}

// ============================================================================
// Bearer Header
// ============================================================================

#[tokio::test]
async fn attaches_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/days"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"date": "2024-05-01"}])))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _store) = client_for(&server, Some(session("A1", Some("R1"))));
    let response = client.dispatch(&ApiRequest::get("/days")).await.unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().unwrap();
    assert_eq!(body[0]["date"], "2024-05-01");
}

#[tokio::test]
async fn no_token_sends_no_authorization_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _store) = client_for(&server, None);
    let response = client.dispatch(&ApiRequest::get("/health")).await.unwrap();
    assert_eq!(response.status(), 200);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn forwards_method_body_and_query_verbatim() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/meals"))
        .and(query_param("day", "2024-05-01"))
        .and(header("authorization", "Bearer A1"))
        .and(header("x-client", "desktop"))
        .and(body_json(json!({"name": "oatmeal", "calories": 320})))
        .respond_with(ResponseTemplate::new(201).set_body_string("created:17"))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _store) = client_for(&server, Some(session("A1", Some("R1"))));
    let request = ApiRequest::post("/meals")
        .with_query("day", "2024-05-01")
        .with_header("X-Client", "desktop")
        .unwrap()
        .with_body(json!({"name": "oatmeal", "calories": 320}));

    let response = client.dispatch(&request).await.unwrap();
    assert_eq!(response.status(), 201);
    assert_eq!(response.body(), b"created:17");
}

#[tokio::test]
async fn identical_dispatches_are_independent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/moods"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;
    mount_refresh(&server, "R1", ResponseTemplate::new(200), 0).await;

    let (client, store) = client_for(&server, Some(session("A1", Some("R1"))));
    let request = ApiRequest::get("/moods");

    assert!(client.dispatch(&request).await.is_ok());
    assert!(client.dispatch(&request).await.is_ok());
    assert_eq!(store.access_token(), Some(AccessToken::new("A1")));
}

// ============================================================================
// Refresh Recovery
// ============================================================================

#[tokio::test]
async fn refreshes_once_and_resubmits() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/days"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "expired"})))
        .expect(1)
        .mount(&server)
        .await;

    mount_refresh(
        &server,
        "R1",
        ResponseTemplate::new(200).set_body_json(json!({"access_token": "A2"})),
        1,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/days"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"days": [1, 2]})))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_for(&server, Some(session("A1", Some("R1"))));
    let response = client.dispatch(&ApiRequest::get("/days")).await.unwrap();

    let body: serde_json::Value = response.json().unwrap();
    assert_eq!(body, json!({"days": [1, 2]}));
    assert_eq!(store.access_token(), Some(AccessToken::new("A2")));
    assert_eq!(store.refresh_token(), Some(RefreshToken::new("R1")));
}

#[tokio::test]
async fn missing_refresh_token_expires_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/notes"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "R1", ResponseTemplate::new(200), 0).await;

    let (client, store) = client_for(&server, Some(session("A1", None)));
    let err = client.dispatch(&ApiRequest::get("/notes")).await.unwrap_err();

    assert!(matches!(err, Error::SessionExpired));
    assert!(store.snapshot().is_none());
}

#[tokio::test]
async fn no_tokens_and_401_is_session_expired() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/days"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_for(&server, None);
    let err = client.dispatch(&ApiRequest::get("/days")).await.unwrap_err();

    assert!(err.is_session_expired());
    assert!(!store.is_authenticated());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn second_401_does_not_refresh_again() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sleep"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    mount_refresh(
        &server,
        "R1",
        ResponseTemplate::new(200).set_body_json(json!({"access_token": "A2"})),
        1,
    )
    .await;

    let (client, store) = client_for(&server, Some(session("A1", Some("R1"))));
    let err = client.dispatch(&ApiRequest::get("/sleep")).await.unwrap_err();

    assert!(matches!(err, Error::SessionExpired));
    assert!(store.snapshot().is_none());

    let requests = server.received_requests().await.unwrap();
    let sleep_auth: Vec<_> = requests
        .iter()
        .filter(|r| r.url.path() == "/sleep")
        .map(|r| r.headers.get("authorization").unwrap().to_str().unwrap().to_string())
        .collect();
    assert_eq!(sleep_auth, ["Bearer A1", "Bearer A2"]);
}

#[tokio::test]
async fn refresh_server_error_clears_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/exercises"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "R1", ResponseTemplate::new(500), 1).await;

    let (client, store) = client_for(&server, Some(session("A1", Some("R1"))));
    let err = client
        .dispatch(&ApiRequest::get("/exercises"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::SessionExpired));
    assert!(store.access_token().is_none());
    assert!(store.refresh_token().is_none());
}

#[tokio::test]
async fn refresh_timeout_clears_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/exercises"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        "R1",
        ResponseTemplate::new(200)
            .set_body_json(json!({"access_token": "A2"}))
            .set_delay(Duration::from_secs(2)),
        1,
    )
    .await;

    let config = ClientConfig::new(mock_api_url(&server)).with_timeout(Duration::from_millis(200));
    let (client, store) = client_with(config, Some(session("A1", Some("R1"))));
    let err = client
        .dispatch(&ApiRequest::get("/exercises"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::SessionExpired));
    assert!(store.snapshot().is_none());
}

#[tokio::test]
async fn malformed_refresh_response_clears_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/days"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        "R1",
        ResponseTemplate::new(200).set_body_json(json!({"token": "A2"})),
        1,
    )
    .await;

    let (client, store) = client_for(&server, Some(session("A1", Some("R1"))));
    let err = client.dispatch(&ApiRequest::get("/days")).await.unwrap_err();

    assert!(matches!(err, Error::SessionExpired));
    assert!(store.snapshot().is_none());
}

#[tokio::test]
async fn coalesced_mode_shares_one_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/days"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    mount_refresh(
        &server,
        "R1",
        ResponseTemplate::new(200)
            .set_body_json(json!({"access_token": "A2"}))
            .set_delay(Duration::from_millis(200)),
        1,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/days"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    let config = ClientConfig::new(mock_api_url(&server)).with_refresh_mode(RefreshMode::Coalesced);
    let (client, store) = client_with(config, Some(session("A1", Some("R1"))));

    let first = ApiRequest::get("/days");
    let second = ApiRequest::get("/days");
    let (a, b) = tokio::join!(client.dispatch(&first), client.dispatch(&second));

    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(store.access_token(), Some(AccessToken::new("A2")));
}

#[tokio::test]
async fn explicit_refresh_replaces_access_token() {
    let server = MockServer::start().await;

    mount_refresh(
        &server,
        "R1",
        ResponseTemplate::new(200).set_body_json(json!({"access_token": "A2"})),
        1,
    )
    .await;

    let (client, store) = client_for(&server, Some(session("A1", Some("R1"))));
    client.refresh().await.unwrap();

    assert_eq!(store.access_token(), Some(AccessToken::new("A2")));
    assert_eq!(store.refresh_token(), Some(RefreshToken::new("R1")));
}

#[tokio::test]
async fn logout_during_refresh_stays_logged_out() {
    let server = MockServer::start().await;

    mount_refresh(
        &server,
        "R1",
        ResponseTemplate::new(200)
            .set_body_json(json!({"access_token": "A2"}))
            .set_delay(Duration::from_millis(300)),
        1,
    )
    .await;

    let (client, store) = client_for(&server, Some(session("A1", Some("R1"))));
    let (refreshed, ()) = tokio::join!(client.refresh(), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        client.logout().unwrap();
    });

    assert!(matches!(refreshed, Err(Error::SessionExpired)));
    assert!(!store.is_authenticated());
    assert!(store.snapshot().is_none());
}

#[tokio::test]
async fn logout_during_refresh_is_not_resubmitted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/days"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        "R1",
        ResponseTemplate::new(200)
            .set_body_json(json!({"access_token": "A2"}))
            .set_delay(Duration::from_millis(300)),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/days"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (client, store) = client_for(&server, Some(session("A1", Some("R1"))));
    let request = ApiRequest::get("/days");
    let (result, ()) = tokio::join!(client.dispatch(&request), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        client.logout().unwrap();
    });

    assert!(matches!(result, Err(Error::SessionExpired)));
    assert!(!store.is_authenticated());
}

/// Keeps tokens in memory but fails every access token write.
#[derive(Debug)]
struct ReadOnlyDiskStore {
    memory: MemorySessionStore,
}

impl SessionStore for ReadOnlyDiskStore {
    fn access_token(&self) -> Option<AccessToken> {
        self.memory.access_token()
    }

    fn refresh_token(&self) -> Option<RefreshToken> {
        self.memory.refresh_token()
    }

    fn user(&self) -> Option<UserProfile> {
        self.memory.user()
    }

    fn set_session(&self, session: SessionData) -> healthlog_core::Result<()> {
        self.memory.set_session(session)
    }

    fn set_access_token(&self, token: AccessToken) -> healthlog_core::Result<bool> {
        self.memory.set_access_token(token)?;
        Err(StoreError::Serialize {
            message: "disk full".to_string(),
        }
        .into())
    }

    fn clear_session(&self) -> healthlog_core::Result<()> {
        self.memory.clear_session()
    }
}

#[tokio::test]
async fn store_failure_after_refresh_still_resubmits() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/days"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        "R1",
        ResponseTemplate::new(200).set_body_json(json!({"access_token": "A2"})),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/days"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(ReadOnlyDiskStore {
        memory: MemorySessionStore::with_session(session("A1", Some("R1"))),
    });
    let shared: Arc<dyn SessionStore> = store.clone();
    let client = AuthClient::new(ClientConfig::new(mock_api_url(&server)), shared).unwrap();

    let response = client.dispatch(&ApiRequest::get("/days")).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(store.access_token(), Some(AccessToken::new("A2")));
    assert_eq!(store.refresh_token(), Some(RefreshToken::new("R1")));
}

// ============================================================================
// Error Mapping
// ============================================================================

#[tokio::test]
async fn maps_error_statuses() {
    let server = MockServer::start().await;

    let cases = [
        ("/forbidden", 403),
        ("/missing", 404),
        ("/broken", 503),
        ("/invalid", 422),
    ];
    for (route, status) in cases {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(json!({"detail": format!("status {status}")})),
            )
            .mount(&server)
            .await;
    }

    let (client, store) = client_for(&server, Some(session("A1", Some("R1"))));

    let err = client.dispatch(&ApiRequest::get("/forbidden")).await.unwrap_err();
    assert!(matches!(err, Error::Forbidden(ref e) if e.message.as_deref() == Some("status 403")));

    let err = client.dispatch(&ApiRequest::get("/missing")).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let err = client.dispatch(&ApiRequest::get("/broken")).await.unwrap_err();
    assert!(matches!(err, Error::Server(ref e) if e.status == 503));

    let err = client.dispatch(&ApiRequest::get("/invalid")).await.unwrap_err();
    assert!(matches!(err, Error::Api(ref e) if e.status == 422));

    // None of these touch the session.
    assert_eq!(store.access_token(), Some(AccessToken::new("A1")));
}

#[tokio::test]
async fn non_json_error_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/days"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_string("Internal Server Error")
                .insert_header("content-type", "text/plain"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, _store) = client_for(&server, Some(session("A1", Some("R1"))));
    let err = client.dispatch(&ApiRequest::get("/days")).await.unwrap_err();

    assert!(matches!(err, Error::Server(ref e) if e.message.is_none()));
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn timeout_is_network_error_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/days"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_for(&server, Some(session("A1", Some("R1"))));
    let request = ApiRequest::get("/days").with_timeout(Duration::from_millis(100));
    let err = client.dispatch(&request).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Network(TransportError::Timeout { duration_ms: 100 })
    ));
    assert!(store.is_authenticated());
}

#[tokio::test]
async fn connection_refused_is_network_error() {
    // Bind then drop a listener so the port is known to be closed.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let config = ClientConfig::new(ApiUrl::new(format!("http://127.0.0.1:{}", port)).unwrap());
    let (client, store) = client_with(config, Some(session("A1", Some("R1"))));
    let err = client.dispatch(&ApiRequest::get("/days")).await.unwrap_err();

    assert!(matches!(err, Error::Network(_)));
    assert!(store.is_authenticated());
}
