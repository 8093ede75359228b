//! Script authority client tests against a mocked authority.

use std::time::Duration;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use narvid_models::ScriptId;
use narvid_script_client::{
    HttpScriptClient, ScriptClientConfig, ScriptClientError, ScriptSnapshotFetcher,
};

fn client(server: &MockServer) -> HttpScriptClient {
    HttpScriptClient::new(ScriptClientConfig {
        base_url: server.uri(),
        api_token: Some("token-1".to_string()),
        timeout: Duration::from_secs(5),
        default_scene_duration_sec: 8.0,
    })
    .unwrap()
}

fn spec_json() -> serde_json::Value {
    serde_json::json!({
        "script_id": "s1",
        "video_id": "v1",
        "title": "Expense policy",
        "total_duration_sec": 0.0,
        "scenes": [
            {
                "scene_id": "sc2",
                "scene_order": 2,
                "chapter_title": "Receipts",
                "narration": "",
                "caption": "Keep your receipts",
                "duration_sec": 0.0
            },
            {
                "scene_id": "sc1",
                "scene_order": 1,
                "chapter_title": "Intro",
                "narration": "Welcome to the expense policy.",
                "duration_sec": 12.0
            }
        ]
    })
}

#[tokio::test]
async fn fetch_normalizes_ordering_and_durations() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/scripts/s1/render-spec"))
        .and(header("authorization", "Bearer token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(spec_json()))
        .expect(1)
        .mount(&server)
        .await;

    let spec = client(&server)
        .fetch_render_spec(&ScriptId::from_string("s1"))
        .await
        .unwrap();

    // sorted by scene_order, zero duration coerced to the default
    assert_eq!(spec.scenes[0].scene_id, "sc1");
    assert_eq!(spec.scenes[1].scene_id, "sc2");
    assert_eq!(spec.scenes[1].duration_sec, 8.0);
    assert_eq!(spec.total_duration_sec, 20.0);
}

#[tokio::test]
async fn not_found_maps_to_script_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/scripts/missing/render-spec"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client(&server)
        .fetch_render_spec(&ScriptId::from_string("missing"))
        .await
        .unwrap_err();

    assert!(matches!(err, ScriptClientError::NotFound(_)));
}

#[tokio::test]
async fn auth_failures_map_to_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/scripts/s1/render-spec"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = client(&server)
        .fetch_render_spec(&ScriptId::from_string("s1"))
        .await
        .unwrap_err();

    assert!(matches!(err, ScriptClientError::Unauthorized(403)));
}

#[tokio::test]
async fn server_errors_map_to_upstream() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/scripts/s1/render-spec"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = client(&server)
        .fetch_render_spec(&ScriptId::from_string("s1"))
        .await
        .unwrap_err();

    assert!(matches!(err, ScriptClientError::Upstream(502)));
}

#[tokio::test]
async fn zero_scene_spec_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/scripts/s1/render-spec"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "script_id": "s1",
            "video_id": "v1",
            "title": "Empty",
            "scenes": []
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .fetch_render_spec(&ScriptId::from_string("s1"))
        .await
        .unwrap_err();

    assert!(matches!(err, ScriptClientError::EmptySpec(_)));
}

#[tokio::test]
async fn approved_probe_distinguishes_found_and_missing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/scripts/s1/render-spec"))
        .respond_with(ResponseTemplate::new(200).set_body_json(spec_json()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/scripts/s2/render-spec"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let c = client(&server);
    assert!(c.has_approved_script(&ScriptId::from_string("s1")).await.unwrap());
    assert!(!c.has_approved_script(&ScriptId::from_string("s2")).await.unwrap());
}
