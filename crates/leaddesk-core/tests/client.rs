use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use leaddesk_core::api::Page;
use leaddesk_core::auth::{AuthEvent, LOGIN_ROUTE};
use leaddesk_core::{
    ApiClient, ApiError, AuthEvents, FileSessionStore, MemorySessionStore, Session, SessionStore,
};

fn session(token: &str) -> Session {
    Session {
        token: token.to_string(),
        business_name: "Acme Plumbing".to_string(),
        is_admin: false,
        client_id: Some("c-42".to_string()),
        email: Some("owner@acme.test".to_string()),
        created_at: Utc::now(),
    }
}

fn client_with(server: &MockServer, store: Arc<dyn SessionStore>, events: AuthEvents) -> ApiClient {
    ApiClient::builder(server.uri())
        .store(store)
        .events(events)
        .build()
        .expect("client")
}

#[tokio::test]
async fn test_no_token_sends_no_authorization_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/dashboard/overview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"leads": 12})))
        .mount(&server)
        .await;

    let store = Arc::new(MemorySessionStore::new());
    let client = client_with(&server, store, AuthEvents::new());

    let overview = client.dashboard().overview().await.unwrap();
    assert_eq!(overview["leads"], 12);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
    assert_eq!(
        requests[0].headers.get("content-type").unwrap(),
        "application/json"
    );
}

#[tokio::test]
async fn test_stored_token_is_sent_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/admin/health"))
        .and(header("authorization", "Bearer tok-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemorySessionStore::with_session(session("tok-abc")));
    let client = client_with(&server, store, AuthEvents::new());

    let health = client.admin().health().await.unwrap();
    assert_eq!(health["status"], "ok");
}

#[tokio::test]
async fn test_token_is_read_at_call_time() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/agents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = Arc::new(MemorySessionStore::new());
    let client = client_with(&server, store.clone(), AuthEvents::new());

    client.agents().fleet().await.unwrap();
    store.set(&session("late-token")).unwrap();
    client.agents().fleet().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
    assert_eq!(
        requests[1].headers.get("authorization").unwrap(),
        "Bearer late-token"
    );
}

#[tokio::test]
async fn test_expired_session_clears_store_and_notifies_shell() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/dashboard/leads"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "token expired"})))
        .mount(&server)
        .await;

    let store = Arc::new(MemorySessionStore::with_session(session("stale")));
    let events = AuthEvents::new();
    let mut rx = events.subscribe();
    let client = client_with(&server, store.clone(), events);

    let err = client.dashboard().leads(Page::default()).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.to_string(), "Unauthorized");

    // Both side effects happened before the caller saw the error
    assert!(store.get().unwrap().is_none());
    assert_eq!(
        rx.try_recv().unwrap(),
        AuthEvent::SessionExpired {
            redirect_to: LOGIN_ROUTE
        }
    );
    assert_eq!(LOGIN_ROUTE, "/login");
}

#[tokio::test]
async fn test_unauthorized_with_non_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("<html>nope</html>"))
        .mount(&server)
        .await;

    let store = Arc::new(MemorySessionStore::with_session(session("stale")));
    let client = client_with(&server, store.clone(), AuthEvents::new());

    let err = client.sales().prospects(Page::new(2)).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    assert!(store.get().unwrap().is_none());
}

#[tokio::test]
async fn test_unauthorized_removes_session_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileSessionStore::new(dir.path().to_path_buf()));
    store.set(&session("stale")).unwrap();
    assert!(store.path().exists());

    let client = client_with(&server, store.clone(), AuthEvents::new());
    let err = client.dashboard().billing().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(!store.path().exists());
}

#[tokio::test]
async fn test_forbidden_keeps_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/admin/clients"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let store = Arc::new(MemorySessionStore::with_session(session("client-token")));
    let events = AuthEvents::new();
    let mut rx = events.subscribe();
    let client = client_with(&server, store.clone(), events);

    let err = client.admin().clients(Page::default()).await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden));
    assert_eq!(err.to_string(), "Admin access required");
    assert_eq!(store.token().unwrap().as_deref(), Some("client-token"));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_error_detail_becomes_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/dashboard/leads/L-9"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Lead not found"})))
        .mount(&server)
        .await;

    let client = client_with(&server, Arc::new(MemorySessionStore::new()), AuthEvents::new());

    let err = client.dashboard().lead("L-9").await.unwrap_err();
    assert_eq!(err.to_string(), "Lead not found");
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_ids_are_encoded_as_one_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/dashboard/leads/a%2Fb%3Fc%23d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "a/b?c#d"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/agents/sms%20bot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "sms bot"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, Arc::new(MemorySessionStore::new()), AuthEvents::new());

    let lead = client.dashboard().lead("a/b?c#d").await.unwrap();
    assert_eq!(lead["id"], "a/b?c#d");
    let agent = client.agents().agent("sms bot").await.unwrap();
    assert_eq!(agent["name"], "sms bot");

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.query().is_none()));
}

#[tokio::test]
async fn test_error_without_detail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/dashboard/campaigns"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "db down"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/dashboard/billing"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let client = client_with(&server, Arc::new(MemorySessionStore::new()), AuthEvents::new());

    let err = client.dashboard().campaigns().await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP 500");

    let err = client.dashboard().billing().await.unwrap_err();
    assert_eq!(err.to_string(), "Request failed");
    assert_eq!(err.status(), Some(502));
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"late": true}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let budget = Duration::from_millis(300);
    let client = ApiClient::builder(server.uri())
        .timeout(budget)
        .build()
        .unwrap();

    let started = Instant::now();
    let err = client.analytics().summary(30).await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(err.is_timeout());
    assert_eq!(err.to_string(), "Request timed out after 300 ms");
    assert!(elapsed >= budget);
    assert!(elapsed < Duration::from_secs(3));
}

#[tokio::test]
async fn test_timed_out_request_is_abandoned() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/dashboard/overview"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"late": true}))
                .set_delay(Duration::from_millis(1000)),
        )
        .mount(&server)
        .await;

    let budget = Duration::from_millis(200);
    let client = ApiClient::builder(server.uri())
        .timeout(budget)
        .build()
        .unwrap();

    let handle = tokio::spawn(async move { client.dashboard().overview().await });

    // Settled well before the server would have answered
    tokio::time::sleep(budget + Duration::from_millis(400)).await;
    assert!(handle.is_finished());
    let err = handle.await.unwrap().unwrap_err();
    assert!(err.is_timeout());

    // Past the server's delay: one request only, no retry, no late result
    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unusable_token_is_cleared_by_server_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/dashboard/overview"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let store = Arc::new(MemorySessionStore::with_session(session("bad\ntoken")));
    let client = client_with(&server, store.clone(), AuthEvents::new());

    let err = client.dashboard().overview().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(store.get().unwrap().is_none());

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_repeated_get_is_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/dashboard/bookings"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_with(
        &server,
        Arc::new(MemorySessionStore::with_session(session("t"))),
        AuthEvents::new(),
    );

    let first = client.dashboard().bookings(Page::default()).await.unwrap();
    let second = client.dashboard().bookings(Page::default()).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_login_persists_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .and(body_json(json!({"email": "owner@acme.test", "password": "hunter2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "fresh-token",
            "business_name": "Acme Plumbing",
            "is_admin": false,
            "client_id": "c-42"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/dashboard/overview"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemorySessionStore::new());
    let client = client_with(&server, store.clone(), AuthEvents::new());

    let login = client
        .auth()
        .login("owner@acme.test", "hunter2")
        .await
        .unwrap();
    assert_eq!(login.token, "fresh-token");
    assert_eq!(login.business_name, "Acme Plumbing");
    assert!(!login.is_admin);

    let stored = store.get().unwrap().expect("session stored");
    assert_eq!(stored.token, "fresh-token");
    assert_eq!(stored.email.as_deref(), Some("owner@acme.test"));

    client.dashboard().overview().await.unwrap();

    client.auth().logout().unwrap();
    assert!(store.get().unwrap().is_none());
}

#[tokio::test]
async fn test_write_sends_serialized_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/dashboard/settings"))
        .and(body_json(json!({"auto_reply": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"saved": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, Arc::new(MemorySessionStore::new()), AuthEvents::new());

    let saved = client
        .dashboard()
        .update_settings(&json!({"auto_reply": true}))
        .await
        .unwrap();
    assert_eq!(saved["saved"], true);
}

#[tokio::test]
async fn test_invalid_success_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = client_with(&server, Arc::new(MemorySessionStore::new()), AuthEvents::new());

    let err = client
        .endpoint("/api/v1/dashboard")
        .get::<Value>("/overview")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn test_connection_failure_is_network_error() {
    // Nothing listens on port 1
    let client = ApiClient::builder("http://127.0.0.1:1").build().unwrap();

    let err = client.dashboard().overview().await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
}

#[tokio::test]
async fn test_unreadable_store_sends_no_token() {
    struct BrokenStore;

    impl SessionStore for BrokenStore {
        fn get(&self) -> anyhow::Result<Option<Session>> {
            Err(anyhow::anyhow!("disk on fire"))
        }
        fn set(&self, _session: &Session) -> anyhow::Result<()> {
            Ok(())
        }
        fn clear(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let client = client_with(&server, Arc::new(BrokenStore), AuthEvents::new());
    client.dashboard().settings().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}
