//! HTTP tests driving the router in-process.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::Duration;
use ewm_testing::{fixtures, test_clock_time, InMemoryStatsCollector};
use ewm_web::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

fn app() -> (Router, InMemoryStatsCollector) {
    let stats = InMemoryStatsCollector::new();
    let service = fixtures::service(Arc::new(stats.clone()));
    (build_router(AppState::new(Arc::new(service))), stats)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send_with(app, Request::builder().method(method).uri(uri), body).await
}

async fn send_with(
    app: &Router,
    builder: axum::http::request::Builder,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body should be JSON")
    };
    (status, value)
}

fn event_body(limit: i64) -> Value {
    let date = test_clock_time() + Duration::days(10);
    json!({
        "title": "Rust Belt Meetup",
        "annotation": "An evening of talks about async Rust in production",
        "description": "Three short talks followed by open discussion and snacks",
        "category": 3,
        "location": { "lat": 59.93, "lon": 30.31 },
        "participantLimit": limit,
        "eventDate": ewm_core::timestamp::format(&date),
    })
}

/// Creates an event through the API and publishes it, returning its id.
async fn published_event(app: &Router, owner: Uuid, limit: i64) -> String {
    let (status, created) = send(
        app,
        Method::POST,
        &format!("/users/{owner}/events"),
        Some(event_body(limit)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, published) = send(
        app,
        Method::PATCH,
        &format!("/admin/events/{id}"),
        Some(json!({ "stateAction": "PUBLISH_EVENT" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(published["state"], "PUBLISHED");
    id
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_applies_defaults_and_wire_format() {
    let (app, _) = app();
    let owner = Uuid::new_v4();

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/users/{owner}/events"),
        Some(event_body(0)),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["state"], "PENDING");
    assert_eq!(body["paid"], false);
    assert_eq!(body["requestModeration"], true);
    assert_eq!(body["confirmedRequests"], 0);
    assert_eq!(body["initiator"], owner.to_string());
    assert_eq!(body["createdOn"], "2025-01-01 00:00:00");
    assert_eq!(body["eventDate"], "2025-01-11 00:00:00");
    assert!(body["publishedOn"].is_null());
}

#[tokio::test]
async fn test_participation_flow_respects_limit() {
    let (app, _) = app();
    let owner = Uuid::new_v4();
    let event_id = published_event(&app, owner, 2).await;

    let mut request_ids = Vec::new();
    for _ in 0..3 {
        let requester = Uuid::new_v4();
        let (status, request) = send(
            &app,
            Method::POST,
            &format!("/users/{requester}/requests?eventId={event_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(request["status"], "PENDING");
        request_ids.push(request["id"].as_str().unwrap().to_string());
    }

    let (status, result) = send(
        &app,
        Method::PATCH,
        &format!("/users/{owner}/events/{event_id}/requests"),
        Some(json!({ "requestIds": request_ids, "status": "CONFIRMED" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["confirmedRequests"].as_array().unwrap().len(), 2);
    assert_eq!(result["rejectedRequests"].as_array().unwrap().len(), 1);
    assert_eq!(result["rejectedRequests"][0]["id"], request_ids[2].as_str());

    let latecomer = Uuid::new_v4();
    let (status, error) = send(
        &app,
        Method::POST,
        &format!("/users/{latecomer}/requests?eventId={event_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["status"], "CONFLICT");
    assert_eq!(error["reason"], "Integrity constraint or business logic violation.");

    let (status, event) = send(&app, Method::GET, &format!("/events/{event_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(event["confirmedRequests"], 2);
}

#[tokio::test]
async fn test_cancel_own_request() {
    let (app, _) = app();
    let event_id = published_event(&app, Uuid::new_v4(), 0).await;
    let requester = Uuid::new_v4();

    let (_, request) = send(
        &app,
        Method::POST,
        &format!("/users/{requester}/requests?eventId={event_id}"),
        None,
    )
    .await;
    assert_eq!(request["status"], "CONFIRMED");
    let request_id = request["id"].as_str().unwrap();

    let stranger = Uuid::new_v4();
    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/users/{stranger}/requests/{request_id}/cancel"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, cancelled) = send(
        &app,
        Method::PATCH,
        &format!("/users/{requester}/requests/{request_id}/cancel"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "CANCELED");

    let (_, mine) = send(&app, Method::GET, &format!("/users/{requester}/requests"), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_bad_input_is_bad_request() {
    let (app, _) = app();
    let owner = Uuid::new_v4();

    let mut short_title = event_body(0);
    short_title["title"] = json!("Hi");
    let (status, error) = send(
        &app,
        Method::POST,
        &format!("/users/{owner}/events"),
        Some(short_title),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["status"], "BAD_REQUEST");
    assert_eq!(error["reason"], "Incorrectly made request.");
    assert!(error["timestamp"].is_string());

    let mut iso_date = event_body(0);
    iso_date["eventDate"] = json!("2025-02-01T10:00:00Z");
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/users/{owner}/events"),
        Some(iso_date),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/events/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/events?size=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::GET,
        "/events?rangeStart=2025-02-02%2000:00:00&rangeEnd=2025-02-01%2000:00:00",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_state_action_is_bad_request() {
    let (app, _) = app();
    let owner = Uuid::new_v4();
    let (_, created) = send(
        &app,
        Method::POST,
        &format!("/users/{owner}/events"),
        Some(event_body(0)),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/admin/events/{id}"),
        Some(json!({ "stateAction": "PUBLISH" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_lifecycle_conflicts() {
    let (app, _) = app();
    let owner = Uuid::new_v4();
    let id = published_event(&app, owner, 0).await;

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/admin/events/{id}"),
        Some(json!({ "stateAction": "PUBLISH_EVENT" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/users/{owner}/events/{id}"),
        Some(json!({ "title": "Renamed meetup" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_private_event_hidden_from_other_users() {
    let (app, _) = app();
    let owner = Uuid::new_v4();
    let id = published_event(&app, owner, 0).await;

    let (status, _) = send(&app, Method::GET, &format!("/users/{owner}/events/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let stranger = Uuid::new_v4();
    let (status, error) = send(&app, Method::GET, &format!("/users/{stranger}/events/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["reason"], "The required object was not found.");

    let (_, listed) = send(&app, Method::GET, &format!("/users/{owner}/events?from=0&size=5"), None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_admin_search_filters_by_state() {
    let (app, _) = app();
    let owner = Uuid::new_v4();
    let published = published_event(&app, owner, 0).await;
    send(
        &app,
        Method::POST,
        &format!("/users/{owner}/events"),
        Some(event_body(0)),
    )
    .await;

    let (status, all) = send(&app, Method::GET, &format!("/admin/events?users={owner}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, only_published) = send(&app, Method::GET, "/admin/events?states=PUBLISHED&categories=3", None).await;
    let ids: Vec<_> = only_published
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec![published]);

    let (status, _) = send(&app, Method::GET, "/admin/events?states=DRAFT", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_public_reads_record_client_ip() {
    let (app, stats) = app();
    let id = published_event(&app, Uuid::new_v4(), 0).await;

    let (status, listed) = send_with(
        &app,
        Request::builder()
            .method(Method::GET)
            .uri("/events?sort=VIEWS")
            .header("X-Forwarded-For", "203.0.113.9, 10.0.0.1"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, Method::GET, &format!("/events/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    assert!(stats.wait_for_hits(2, std::time::Duration::from_secs(2)).await);
    let hits = stats.hits();
    let listing = hits.iter().find(|h| h.uri == "/events").unwrap();
    assert_eq!(listing.ip, "203.0.113.9");
    assert_eq!(listing.app, "ewm-main-service");
    let detail = hits.iter().find(|h| h.uri == format!("/events/{id}")).unwrap();
    assert_eq!(detail.ip, "127.0.0.1");
}

#[tokio::test]
async fn test_unpublished_event_is_not_public() {
    let (app, _) = app();
    let owner = Uuid::new_v4();
    let (_, created) = send(
        &app,
        Method::POST,
        &format!("/users/{owner}/events"),
        Some(event_body(0)),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let (status, _) = send(&app, Method::GET, &format!("/events/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/users/{}/requests?eventId={id}", Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
