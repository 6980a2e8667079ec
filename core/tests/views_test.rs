//! View aggregation tests: decoration, fallbacks, sorting and hit recording.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use chrono::Duration;
use ewm_core::error::DomainError;
use ewm_core::query::{AdminFilter, Page, PublicFilter};
use ewm_core::stats::event_uri;
use ewm_core::types::{AdminUpdate, ClientContext, EventPatch, EventState, SortKey, UserId};
use ewm_testing::{
    fixtures, test_clock_time, FailingStatsCollector, InMemoryStatsCollector, SlowStatsCollector,
};
use std::sync::Arc;

fn visitor(endpoint: &str) -> ClientContext {
    ClientContext {
        ip: "192.0.2.10".to_string(),
        endpoint: endpoint.to_string(),
    }
}

#[tokio::test]
async fn test_listing_merges_counts_and_sorts_by_views() {
    let stats = InMemoryStatsCollector::new();
    let service = fixtures::service(Arc::new(stats.clone()));
    let quiet = fixtures::published_event(&service, UserId::new(), 0, true).await;
    let popular = fixtures::published_event(&service, UserId::new(), 0, true).await;
    stats.seed(&event_uri(quiet.id), "10.0.0.1", 2);
    stats.seed(&event_uri(popular.id), "10.0.0.1", 7);

    let filter = PublicFilter {
        sort: Some(SortKey::Views),
        ..PublicFilter::default()
    };
    let events = service.list_public(&filter, &visitor("/events")).await.unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].id, popular.id);
    assert_eq!(events[0].views, 7);
    assert_eq!(events[1].views, 2);

    let query = stats.queries().pop().unwrap();
    assert!(!query.unique);
    assert_eq!(query.end, test_clock_time());
    assert_eq!(query.uris.len(), 2);
}

#[tokio::test]
async fn test_detail_uses_distinct_visitors() {
    let stats = InMemoryStatsCollector::new();
    let service = fixtures::service(Arc::new(stats.clone()));
    let event = fixtures::published_event(&service, UserId::new(), 0, true).await;
    let uri = event_uri(event.id);
    stats.seed(&uri, "10.0.0.1", 4);
    stats.seed(&uri, "10.0.0.2", 1);

    let fetched = service.get_public(event.id, &visitor(&uri)).await.unwrap();

    // The visit is recorded after the count is taken.
    assert_eq!(fetched.views, 2);
    assert!(stats.queries().iter().any(|q| q.unique));
}

#[tokio::test]
async fn test_public_reads_record_hits() {
    let stats = InMemoryStatsCollector::new();
    let service = fixtures::service(Arc::new(stats.clone()));
    let event = fixtures::published_event(&service, UserId::new(), 0, true).await;

    service
        .list_public(&PublicFilter::default(), &visitor("/events"))
        .await
        .unwrap();
    service
        .get_public(event.id, &visitor(&event_uri(event.id)))
        .await
        .unwrap();

    assert!(stats.wait_for_hits(2, std::time::Duration::from_secs(2)).await);
    let uris: Vec<_> = stats.hits().into_iter().map(|h| h.uri).collect();
    assert!(uris.contains(&"/events".to_string()));
    assert!(uris.contains(&event_uri(event.id)));
}

#[tokio::test]
async fn test_collector_failure_keeps_cached_views() {
    let service = fixtures::service(Arc::new(FailingStatsCollector));
    let event = fixtures::published_event(&service, UserId::new(), 0, true).await;

    let listed = service
        .list_public(&PublicFilter::default(), &visitor("/events"))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].views, 0);

    let fetched = service
        .get_public(event.id, &visitor(&event_uri(event.id)))
        .await
        .unwrap();
    assert_eq!(fetched.views, 0);
}

#[tokio::test]
async fn test_first_detail_visit_does_not_count_itself() {
    let stats = InMemoryStatsCollector::new();
    let service = fixtures::service(Arc::new(stats.clone()));
    let event = fixtures::published_event(&service, UserId::new(), 0, true).await;
    let uri = event_uri(event.id);

    let fetched = service.get_public(event.id, &visitor(&uri)).await.unwrap();

    assert_eq!(fetched.views, 0);
    assert!(stats.wait_for_hits(1, std::time::Duration::from_secs(2)).await);
}

#[tokio::test]
async fn test_outage_serves_last_known_views() {
    let stats = InMemoryStatsCollector::new();
    let service = fixtures::service(Arc::new(stats.clone()));
    let event = fixtures::published_event(&service, UserId::new(), 0, true).await;
    let uri = event_uri(event.id);
    stats.seed(&uri, "10.0.0.1", 7);

    let listed = service
        .list_public(&PublicFilter::default(), &visitor("/events"))
        .await
        .unwrap();
    assert_eq!(listed[0].views, 7);

    stats.set_unavailable(true);
    let listed = service
        .list_public(&PublicFilter::default(), &visitor("/events"))
        .await
        .unwrap();
    assert_eq!(listed[0].views, 7);

    stats.set_unavailable(false);
    let fetched = service.get_public(event.id, &visitor(&uri)).await.unwrap();
    assert_eq!(fetched.views, 1);

    stats.set_unavailable(true);
    let fetched = service.get_public(event.id, &visitor(&uri)).await.unwrap();
    assert_eq!(fetched.views, 1);
    let owned = service.initiator_event(event.initiator, event.id).await.unwrap();
    assert_eq!(owned.views, 1);
}

#[tokio::test]
async fn test_slow_collector_times_out_to_cached_views() {
    let inner = InMemoryStatsCollector::new();
    let slow = SlowStatsCollector::new(inner.clone(), std::time::Duration::from_secs(5));
    let service = fixtures::service(Arc::new(slow));
    let event = fixtures::published_event(&service, UserId::new(), 0, true).await;
    inner.seed(&event_uri(event.id), "10.0.0.1", 9);

    let started = std::time::Instant::now();
    let listed = service
        .list_public(&PublicFilter::default(), &visitor("/events"))
        .await
        .unwrap();

    assert!(started.elapsed() < std::time::Duration::from_secs(2));
    assert_eq!(listed[0].views, 0);
}

#[tokio::test]
async fn test_unpublished_event_is_hidden_from_public() {
    let service = fixtures::service(Arc::new(InMemoryStatsCollector::new()));
    let pending = service
        .create_event(UserId::new(), fixtures::draft(3))
        .await
        .unwrap();

    let result = service
        .get_public(pending.id, &visitor(&event_uri(pending.id)))
        .await;
    assert!(matches!(result, Err(DomainError::NotFound(_))));

    let listed = service
        .list_public(&PublicFilter::default(), &visitor("/events"))
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_public_filters_and_paging() {
    let service = fixtures::service(Arc::new(InMemoryStatsCollector::new()));
    let full = fixtures::published_event(&service, UserId::new(), 1, false).await;
    service.allocator().submit(UserId::new(), full.id).await.unwrap();
    let open = fixtures::published_event(&service, UserId::new(), 5, false).await;
    let later = fixtures::published_event(&service, UserId::new(), 0, true).await;
    service
        .update_by_admin(
            later.id,
            AdminUpdate {
                patch: EventPatch {
                    event_date: Some(test_clock_time() + Duration::days(30)),
                    description: Some("A quiet afternoon of KNITTING and tea".to_string()),
                    ..EventPatch::default()
                },
                action: None,
            },
        )
        .await
        .unwrap();

    let available = service
        .list_public(
            &PublicFilter {
                only_available: true,
                ..PublicFilter::default()
            },
            &visitor("/events"),
        )
        .await
        .unwrap();
    let ids: Vec<_> = available.iter().map(|e| e.id).collect();
    assert!(!ids.contains(&full.id));
    assert!(ids.contains(&open.id));

    let text = service
        .list_public(
            &PublicFilter {
                text: Some("knitting".to_string()),
                ..PublicFilter::default()
            },
            &visitor("/events"),
        )
        .await
        .unwrap();
    assert_eq!(text.len(), 1);
    assert_eq!(text[0].id, later.id);

    let by_date = service
        .list_public(
            &PublicFilter {
                sort: Some(SortKey::EventDate),
                page: Page::new(0, 1),
                ..PublicFilter::default()
            },
            &visitor("/events"),
        )
        .await
        .unwrap();
    assert_eq!(by_date.len(), 1);
    assert_eq!(by_date[0].id, later.id);
}

#[tokio::test]
async fn test_inverted_range_is_validation_error() {
    let service = fixtures::service(Arc::new(InMemoryStatsCollector::new()));
    let filter = PublicFilter {
        range_start: Some(test_clock_time() + Duration::days(2)),
        range_end: Some(test_clock_time() + Duration::days(1)),
        ..PublicFilter::default()
    };
    let result = service.list_public(&filter, &visitor("/events")).await;
    assert!(matches!(result, Err(DomainError::Validation(_))));
}

#[tokio::test]
async fn test_admin_search_filters_and_decorates() {
    let stats = InMemoryStatsCollector::new();
    let service = fixtures::service(Arc::new(stats.clone()));
    let owner = UserId::new();
    let published = fixtures::published_event(&service, owner, 0, true).await;
    let pending = service.create_event(owner, fixtures::draft(5)).await.unwrap();
    fixtures::published_event(&service, UserId::new(), 0, true).await;
    stats.seed(&event_uri(published.id), "10.0.0.1", 4);

    let mine = service
        .search_admin(&AdminFilter {
            users: vec![owner],
            ..AdminFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(mine.len(), 2);
    // Admin search sees every state, no hit is recorded.
    assert!(mine.iter().any(|e| e.id == pending.id));
    assert!(stats.hits().iter().all(|h| h.ip == "10.0.0.1"));

    let only_published = service
        .search_admin(&AdminFilter {
            users: vec![owner],
            states: vec![EventState::Published],
            ..AdminFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(only_published.len(), 1);
    assert_eq!(only_published[0].views, 4);

    let before_now = service
        .search_admin(&AdminFilter {
            range_end: Some(test_clock_time()),
            ..AdminFilter::default()
        })
        .await
        .unwrap();
    assert!(before_now.is_empty());
}
