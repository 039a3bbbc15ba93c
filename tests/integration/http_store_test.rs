//! Integration tests for the HTTP document store against a mock server.

use crate::common::easy_run;
use chrono::{TimeZone, Utc};
use paceline::identity::{IdentityProvider, LocalIdentity};
use paceline::storage::FlagStore;
use paceline::sync::{Collection, DocumentPath, DocumentStore, HttpDocumentStore, RemoteError, RemoteMirror};
use paceline::{RunType, WeeklyTarget};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mirror_for(server: &MockServer, user_id: &str) -> RemoteMirror {
    let store = HttpDocumentStore::new(&server.uri()).unwrap();
    let identity: Arc<dyn IdentityProvider> = Arc::new(LocalIdentity::new(
        Arc::new(FlagStore::in_memory()),
        Some(user_id.to_string()),
    ));
    RemoteMirror::new(Arc::new(store), identity)
}

#[tokio::test]
async fn test_run_is_put_under_its_id() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/users/u1/runLogs/7"))
        .and(body_partial_json(json!({
            "localId": 7,
            "durationMinutes": 45,
            "runType": "ZONE2",
            "paceSecondsPerKm": 390
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let run = easy_run(Utc::now(), 45).with_id(7);
    mirror_for(&server, "u1").save_run(&run).await.unwrap();
}

#[tokio::test]
async fn test_missing_document_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/u1/targets/current"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let target = mirror_for(&server, "u1").fetch_target().await.unwrap();
    assert!(target.is_none());
}

#[tokio::test]
async fn test_target_is_fetched_and_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/u1/targets/current"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "zone2PaceSecondsPerKm": 390,
            "tempoPaceSecondsPerKm": 300,
            "weeklyDurationMinutes": 180,
            "zone2Note": "conversational"
        })))
        .mount(&server)
        .await;

    let target = mirror_for(&server, "u1").fetch_target().await.unwrap().unwrap();
    let mut expected = WeeklyTarget::new(390, 300, 180);
    expected.zone2_note = "conversational".to_string();
    assert_eq!(target, expected);
}

#[tokio::test]
async fn test_collection_listing() {
    let server = MockServer::start().await;
    let date = Utc.with_ymd_and_hms(2025, 1, 8, 7, 0, 0).unwrap();
    Mock::given(method("GET"))
        .and(path("/users/u1/runLogs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "3": {"localId": 3, "date": date.timestamp_millis(), "durationMinutes": 30, "runType": "ZONE2", "paceSecondsPerKm": 400},
            "4": {"localId": 4, "date": date.timestamp_millis(), "durationMinutes": 20, "runType": "TEMPO", "paceSecondsPerKm": 290}
        })))
        .mount(&server)
        .await;

    let mut runs = mirror_for(&server, "u1").fetch_runs().await.unwrap();
    runs.sort_by_key(|r| r.id);

    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].date, date);
    assert_eq!(runs[1].run_type, RunType::Tempo);
    assert_eq!(runs[1].pace_seconds_per_km, 290);
}

#[tokio::test]
async fn test_missing_collection_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/u1/achievements"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let achievements = mirror_for(&server, "u1").fetch_achievements().await.unwrap();
    assert!(achievements.is_empty());
}

#[tokio::test]
async fn test_delete_of_absent_document_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/users/u1/raceGoal/current"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    mirror_for(&server, "u1").delete_race_goal().await.unwrap();
}

#[tokio::test]
async fn test_server_error_is_reported_with_path() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = HttpDocumentStore::new(&server.uri()).unwrap();
    let err = store
        .put(&DocumentPath::current("u1", Collection::Profile), json!({"name": "Ana"}))
        .await
        .unwrap_err();

    match err {
        RemoteError::Status { status, path } => {
            assert_eq!(status, 500);
            assert_eq!(path, "users/u1/profile/current");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_base_path_is_preserved() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/users/u1/profile/current"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Ana",
            "gender": "FEMALE",
            "age": 34
        })))
        .mount(&server)
        .await;

    let store = HttpDocumentStore::new(&format!("{}/v1/", server.uri())).unwrap();
    let doc = store
        .get(&DocumentPath::current("u1", Collection::Profile))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(doc["name"], "Ana");
}
