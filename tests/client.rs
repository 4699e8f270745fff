mod common;

use apexvision_client::api::ImageAnalysisRequest;
use apexvision_client::{
    Error, Feature, MemoryHistory, NetworkError, Originator, SessionStore, UserStats,
};
use common::{SharedDocs, TestClient, client_for};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn signed_in(server: &MockServer, docs: SharedDocs) -> TestClient {
    Mock::given(method("POST"))
        .and(path("/google_login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user_id": "u-1" })))
        .mount(server)
        .await;
    let client = client_for(server, docs);
    client.broker().sign_in_with_google(&()).await.unwrap();
    client
}

fn chat_reply(body: serde_json::Value) -> Mock {
    Mock::given(method("POST"))
        .and(path("/get_gpt_response"))
        .and(header("UserId", "u-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
}

#[tokio::test]
async fn signed_out_requests_are_refused_locally() {
    let server = MockServer::start().await;
    Mock::given(path("/get_gpt_response"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let client = client_for(&server, SharedDocs::default());
    let mut sessions = SessionStore::open(MemoryHistory::new());

    let err = client.send_chat(&mut sessions, "hello").await.unwrap_err();
    assert!(matches!(err, Error::NotAuthenticated));
    assert!(sessions.current().is_empty());
}

#[tokio::test]
async fn exhausted_quota_makes_no_request() {
    let server = MockServer::start().await;
    let docs = SharedDocs::default();
    docs.set("u-1", "No subscription", 15, 0);
    let client = signed_in(&server, docs).await;
    chat_reply(json!({ "status": "success", "response": "hi" }))
        .expect(0)
        .mount(&server)
        .await;
    let mut sessions = SessionStore::open(MemoryHistory::new());

    assert!(!client.can_make_request());
    let err = client.send_chat(&mut sessions, "hello").await.unwrap_err();
    assert!(matches!(err, Error::QuotaExceeded(v) if !v.allowed));
    assert!(sessions.current().is_empty());
    assert!(client.last_error(Feature::Chat).is_some());
}

#[tokio::test]
async fn mastermind_limit_is_exclusive() {
    let server = MockServer::start().await;
    let docs = SharedDocs::default();
    docs.set("u-1", "Mastermind", 1999, 0);
    let client = signed_in(&server, docs.clone()).await;
    assert!(client.can_make_request());

    docs.set("u-1", "Mastermind", 2000, 0);
    client.broker().refresh_entitlements().await;
    assert!(!client.can_make_request());
}

#[tokio::test]
async fn chat_appends_both_turns_and_refreshes() {
    let server = MockServer::start().await;
    let docs = SharedDocs::default();
    docs.set("u-1", "Savvy Scholar", 10, 0);
    let client = signed_in(&server, docs.clone()).await;
    chat_reply(json!({ "status": "success", "response": "Eigenvalues scale eigenvectors." }))
        .expect(1)
        .mount(&server)
        .await;
    let mut sessions = SessionStore::open(MemoryHistory::new());

    // Backend counts the request; the refresh after success must pick it up.
    docs.set("u-1", "Savvy Scholar", 11, 0);
    let reply = client
        .send_chat(&mut sessions, "Explain eigenvalues")
        .await
        .unwrap();
    assert_eq!(reply, "Eigenvalues scale eigenvectors.");

    let turns = sessions.current().turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].originator, Originator::User);
    assert_eq!(turns[0].text, "Explain eigenvalues");
    assert_eq!(turns[1].originator, Originator::Assistant);
    assert_eq!(client.entitlements().snapshot().request_count, 11);
    assert!(client.last_error(Feature::Chat).is_none());
}

#[tokio::test]
async fn chat_error_payload_becomes_error_turn() {
    let server = MockServer::start().await;
    let client = signed_in(&server, SharedDocs::default()).await;
    chat_reply(json!({ "status": "error", "error": "Model overloaded" }))
        .mount(&server)
        .await;
    let mut sessions = SessionStore::open(MemoryHistory::new());

    let err = client.send_chat(&mut sessions, "hello").await.unwrap_err();
    assert!(matches!(err, Error::Backend(ref m) if m == "Model overloaded"));

    let turns = sessions.current().turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[1].text, "Error: Model overloaded");
    assert_eq!(
        client.last_error(Feature::Chat).as_deref(),
        Some("Model overloaded")
    );
}

#[tokio::test]
async fn chat_server_failure_keeps_entitlement() {
    let server = MockServer::start().await;
    let docs = SharedDocs::default();
    docs.set("u-1", "Knowledge Kickstart", 3, 0);
    let client = signed_in(&server, docs.clone()).await;
    Mock::given(path("/get_gpt_response"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    let mut sessions = SessionStore::open(MemoryHistory::new());

    docs.set("u-1", "Knowledge Kickstart", 4, 0);
    let err = client.send_chat(&mut sessions, "hello").await.unwrap_err();
    assert!(matches!(err, Error::Network(NetworkError::Server(502))));
    assert_eq!(client.entitlements().snapshot().request_count, 3);
    assert_eq!(
        sessions.current().turns().last().unwrap().text,
        "Error: Server error: 502"
    );
}

#[tokio::test]
async fn mathpix_requires_mastermind() {
    let server = MockServer::start().await;
    let docs = SharedDocs::default();
    docs.set("u-1", "Knowledge Kickstart", 0, 0);
    let client = signed_in(&server, docs.clone()).await;
    Mock::given(method("POST"))
        .and(path("/analyze_image"))
        .and(body_partial_json(json!({ "useMathpix": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "answer": "x = 2" })))
        .expect(1)
        .mount(&server)
        .await;

    client
        .analyze_image(ImageAnalysisRequest::from_jpeg(b"\xff\xd8\xff", true))
        .await
        .unwrap();
}

#[tokio::test]
async fn leaderboard_skips_quota() {
    let server = MockServer::start().await;
    let docs = SharedDocs::default();
    docs.set("u-1", "Cancelled", 0, 0);
    let client = signed_in(&server, docs).await;
    Mock::given(method("POST"))
        .and(path("/leaderboard/submit"))
        .and(body_json(json!({ "streak": 0, "dailyQuestions": 0, "totalDays": 0 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rank": 4,
            "total_users": 120,
            "message": "Stats updated"
        })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(!client.can_make_request());
    let response = client
        .submit_leaderboard(&UserStats::default())
        .await
        .unwrap();
    assert_eq!(response.rank, 4);
}

#[tokio::test]
async fn local_state_lives_at_configured_paths() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = apexvision_client::ClientConfig::new(server.uri().parse().unwrap())
        .with_history_path(dir.path().join("history.json"))
        .with_preferences_path(dir.path().join("prefs.json"));
    let client = apexvision_client::ApexClient::new(
        config,
        common::StubGoogle::ok(),
        common::StubFederated::default(),
        SharedDocs::default(),
    );

    let mut sessions = client.open_sessions();
    sessions.append_turn("hi", Originator::User).unwrap();
    sessions.close().unwrap();
    assert_eq!(client.open_sessions().archived().len(), 1);

    let mut prefs = client.open_preferences();
    prefs.set_dark_mode(true).unwrap();
    assert!(client.open_preferences().get().dark_mode);
}

#[tokio::test]
async fn every_feature_shares_the_chat_gate() {
    let server = MockServer::start().await;
    Mock::given(path("/math"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let docs = SharedDocs::default();
    docs.set("u-1", "Cancelled", 0, 0);

    let signed_out = client_for(&server, docs.clone());
    assert!(matches!(
        signed_out.leaderboard().await.unwrap_err(),
        Error::NotAuthenticated
    ));
    assert!(signed_out.last_error(Feature::Leaderboard).is_some());

    let client = signed_in(&server, docs).await;
    let err = client.solve_math("2 + 2").await.unwrap_err();
    assert!(matches!(err, Error::QuotaExceeded(_)));
    assert_eq!(
        client.last_error(Feature::Math),
        Some(err.to_string())
    );
}

#[tokio::test]
async fn caller_records_streak_after_reply() {
    let server = MockServer::start().await;
    let client = signed_in(&server, SharedDocs::default()).await;
    chat_reply(json!({ "status": "success", "response": "4" }))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/leaderboard/submit"))
        .and(body_json(json!({ "streak": 1, "dailyQuestions": 1, "totalDays": 1 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rank": 1,
            "total_users": 1,
            "message": "Stats updated"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let mut sessions = SessionStore::open(MemoryHistory::new());
    let mut stats = UserStats::default();

    client.send_chat(&mut sessions, "2 + 2").await.unwrap();
    stats.record_question(time::macros::date!(2025 - 03 - 10));

    assert_eq!(client.submit_leaderboard(&stats).await.unwrap().rank, 1);
}
