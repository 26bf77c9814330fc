//! Integration tests for the collector
//!
//! These tests use wiremock to stand in for the upstream activity API and drive
//! full invocations through the HTTP page source.

use activity_collector::collector::{fetch_all, poll_once, PageRequest, ReportsClient};
use activity_collector::config::{QuotaConfig, RecordConfig, SchedulerSettings, UpstreamConfig};
use activity_collector::credentials::StaticCredentials;
use activity_collector::output::RecordFramer;
use activity_collector::state::{CollectionState, FetchOutcome};
use activity_collector::storage::{SqliteStateStore, StateStore};
use activity_collector::CollectorError;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn d0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

fn create_client(server: &MockServer) -> ReportsClient {
    let upstream = UpstreamConfig {
        base_url: format!("{}/activity", server.uri()),
        max_results: 2,
        timeout_seconds: 5,
        user_agent: "activity-collector/test".to_string(),
    };
    let credentials = Arc::new(StaticCredentials::new(
        "test-token",
        vec!["audit.readonly".to_string()],
    ));
    ReportsClient::new(&upstream, &QuotaConfig::default(), credentials)
        .expect("Failed to build client")
}

fn settings(page_budget: u32) -> SchedulerSettings {
    SchedulerSettings {
        page_budget,
        ..SchedulerSettings::with_poll_interval(60)
    }
}

fn activity(n: i64) -> serde_json::Value {
    json!({
        "id": {
            "time": format!("2024-03-01T12:00:{:02}.125Z", n),
            "applicationName": "login"
        },
        "events": [{"name": "login_success"}],
        "seq": n
    })
}

fn quota_body() -> serde_json::Value {
    json!({
        "error": {
            "code": 403,
            "message": "Daily Limit Exceeded",
            "errors": [{"reason": "dailyLimitExceeded", "domain": "usageLimits"}]
        }
    })
}

/// Mounts three pages chained by tokens "p2" and "p3"
async fn mount_three_pages(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/activity/login"))
        .and(query_param("pageToken", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [activity(3), activity(4)],
            "nextPageToken": "p3"
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/activity/login"))
        .and(query_param("pageToken", "p3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [activity(5)]
        })))
        .mount(server)
        .await;

    // Lowest priority: the first page, matched when no more specific mock applies
    Mock::given(method("GET"))
        .and(path("/activity/login"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [activity(1), activity(2)],
            "nextPageToken": "p2"
        })))
        .with_priority(10)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_all_drains_three_pages() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;
    let client = create_client(&server);

    let request = PageRequest {
        target: "login".to_string(),
        since: d0(),
        until: d0() + Duration::hours(1),
        page_token: None,
    };

    let outcome = fetch_all(&client, &request, 3).await.expect("fetch failed");

    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    assert!(outcome.continuation_token().is_none());

    let seqs: Vec<i64> = outcome
        .into_records()
        .iter()
        .map(|r| r["seq"].as_i64().unwrap())
        .collect();
    assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_request_carries_window_and_page_size() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/activity/login"))
        .and(query_param("startTime", "2024-03-01T12:00:00.000Z"))
        .and(query_param("endTime", "2024-03-01T13:00:00.000Z"))
        .and(query_param("maxResults", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"kind": "activities"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_client(&server);
    let request = PageRequest {
        target: "login".to_string(),
        since: d0(),
        until: d0() + Duration::hours(1),
        page_token: None,
    };

    let outcome = fetch_all(&client, &request, 1).await.expect("fetch failed");
    assert_eq!(outcome, FetchOutcome::empty());
}

#[tokio::test]
async fn test_invocations_page_then_advance() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;
    let client = create_client(&server);
    let framer = RecordFramer::from_config(&RecordConfig::default());
    let mut store = SqliteStateStore::new_in_memory().expect("store");

    let state = CollectionState::new("login", d0(), 60, 1);
    store.save_state(&state).unwrap();
    let now = d0() + Duration::hours(3);

    // Budget of two pages: the window stays put and the cursor is carried forward
    let first = poll_once(&client, &framer, &state, now, &settings(2))
        .await
        .expect("first invocation");
    assert_eq!(first.records.len(), 4);
    assert_eq!(first.state.continuation_token.as_deref(), Some("p3"));
    assert_eq!(first.state.since, state.since);
    assert_eq!(first.state.until, state.until);
    assert_eq!(first.delay_secs, 1);
    store.save_state(&first.state).unwrap();

    // Resuming from the stored cursor drains the window and advances it
    let resumed = store.load_state("login").unwrap().unwrap();
    let second = poll_once(&client, &framer, &resumed, now, &settings(2))
        .await
        .expect("second invocation");
    assert_eq!(second.records.len(), 1);
    assert_eq!(second.records[0].type_id.as_deref(), Some("login"));
    assert_eq!(second.records[0].timestamp_usec, Some(125_000));
    assert!(second.state.continuation_token.is_none());
    assert_eq!(second.state.since, state.until);
    assert_eq!(second.state.window(), Duration::hours(1));
    assert_eq!(second.delay_secs, 1);
}

#[tokio::test]
async fn test_quota_error_on_second_page_discards_first() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/activity/login"))
        .and(query_param("pageToken", "p2"))
        .respond_with(ResponseTemplate::new(403).set_body_json(quota_body()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/activity/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [activity(1)],
            "nextPageToken": "p2"
        })))
        .with_priority(10)
        .mount(&server)
        .await;

    let client = create_client(&server);
    let framer = RecordFramer::from_config(&RecordConfig::default());
    let state = CollectionState::new("login", d0(), 60, 60);
    let now = d0() + Duration::minutes(30);

    let result = poll_once(&client, &framer, &state, now, &settings(3))
        .await
        .expect("quota is handled in-band");

    assert!(result.records.is_empty());
    assert_eq!(result.state.since, state.since);
    assert_eq!(result.state.until, state.until);
    assert!(result.state.quota_reset_at.unwrap() > now);
    assert_eq!(result.delay_secs, 900);

    // While the quota is exhausted, no further request reaches the upstream
    let before = server.received_requests().await.unwrap().len();
    let held = poll_once(&client, &framer, &result.state, now + Duration::minutes(15), &settings(3))
        .await
        .expect("held invocation");
    assert_eq!(server.received_requests().await.unwrap().len(), before);
    assert_eq!(held.state, result.state);
    assert!(held.records.is_empty());
}

#[tokio::test]
async fn test_server_error_propagates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/activity/login"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let client = create_client(&server);
    let framer = RecordFramer::from_config(&RecordConfig::default());
    let state = CollectionState::new("login", d0(), 60, 60);

    let result = poll_once(&client, &framer, &state, d0() + Duration::hours(1), &settings(1)).await;

    match result {
        Err(CollectorError::Upstream {
            status, message, ..
        }) => {
            assert_eq!(status, 503);
            assert!(message.contains("unavailable"));
        }
        other => panic!("expected upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_page_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/activity/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let client = create_client(&server);
    let request = PageRequest {
        target: "login".to_string(),
        since: d0(),
        until: d0() + Duration::minutes(1),
        page_token: None,
    };

    let result = fetch_all(&client, &request, 1).await;
    assert!(matches!(result, Err(CollectorError::Decode { .. })));
}
