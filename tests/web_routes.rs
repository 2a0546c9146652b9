//! Integration tests for the browser-facing routes.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::util::ServiceExt;

use event_gateway::config::MetricsConfig;
use event_gateway::domain::NewTopic;
use event_gateway::server::create_router;
use event_gateway::store::{EventStore, MemoryEventStore};

async fn test_app() -> (axum::Router, Arc<MemoryEventStore>) {
    let store = Arc::new(MemoryEventStore::new());
    store
        .create_topic(NewTopic {
            name: "deploys".to_string(),
            schema: Default::default(),
        })
        .await
        .unwrap();
    store.create_dc("us-east-1").await.unwrap();

    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let handle = Arc::new(recorder.handle());

    let metrics_cfg = MetricsConfig {
        enabled: true,
        endpoint: "/metrics".to_string(),
    };
    let app = create_router(store.clone() as Arc<dyn EventStore>, handle, &metrics_cfg);
    (app, store)
}

#[tokio::test]
async fn test_main_page_ok() {
    let (app, _) = test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_healthz_and_metrics() {
    let (app, _) = test_app().await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_query_page_with_dates() {
    let (app, _) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/event?dc=&host=&topic=&startDate=2023-01-01&endDate=")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_query_page_rejects_malformed_date() {
    let (app, _) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/event?startDate=garbage")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_form_page() {
    let (app, _) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/create_form")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_create_submit_redirects() {
    let (app, store) = test_app().await;

    let body = "topic=deploys&dc=us-east-1&tags=a%2Cb&host=web-1&user=me\
                &data=%7B%7D&date=2023-01-01&time=12%3A30";
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/add_event")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");
    assert_eq!(store.create_count().await, 1);
}

#[tokio::test]
async fn test_create_submit_missing_time_is_client_error() {
    let (app, store) = test_app().await;

    let body = "topic=deploys&dc=us-east-1&tags=&host=web-1&user=me\
                &data=&date=2023-01-01&time=";
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/add_event")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.create_count().await, 0);
}
