//! Exposition server round-trips and shutdown protocol.

use std::time::Duration;

use axum::http::StatusCode;
use svc_observability::config::{MetricsConfig, DEFAULT_METRICS_PATH};
use svc_observability::lifecycle::{ServerState, Shutdown};
use svc_observability::metrics::{
    LabelSet, MetricsRegistry, MetricsServer, MetricsServerError, EXPOSITION_CONTENT_TYPE,
    HTTP_SERVER_REQUESTS,
};

mod common;

fn server(registry: &MetricsRegistry, shutdown: &Shutdown) -> MetricsServer {
    MetricsServer::new(
        "canals",
        &MetricsConfig::default(),
        registry.clone(),
        shutdown.clone(),
    )
    .unwrap()
    .without_signal_handling()
}

#[tokio::test]
async fn test_scrape_default_path() {
    let registry = MetricsRegistry::new();
    let shutdown = Shutdown::new();
    let server = server(&registry, &shutdown);

    let labels = LabelSet::from_pairs(&["method", "GET", "uri", "/x", "status", "200", "outcome", "SUCCESS"]);
    registry.record_duration(HTTP_SERVER_REQUESTS, &labels, Duration::from_millis(150));

    let (listener, addr) = common::ephemeral_listener().await;
    let handle = tokio::spawn(async move { server.serve(listener).await });

    let response = reqwest::get(format!("http://{addr}{DEFAULT_METRICS_PATH}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        EXPOSITION_CONTENT_TYPE
    );

    let body = response.text().await.unwrap();
    assert!(
        body.contains(
            r#"http_server_requests_count{method="GET",outcome="SUCCESS",status="200",uri="/x"} 1"#
        ),
        "unexpected body:\n{body}"
    );
    assert!(body.contains("http_server_requests_sum"));

    shutdown.trigger();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_other_paths_are_not_found() {
    let registry = MetricsRegistry::new();
    let shutdown = Shutdown::new();
    let server = server(&registry, &shutdown);

    let (listener, addr) = common::ephemeral_listener().await;
    let handle = tokio::spawn(async move { server.serve(listener).await });

    let response = reqwest::get(format!("http://{addr}/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    shutdown.trigger();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_cancellation_stops_cleanly() {
    let registry = MetricsRegistry::new();
    let shutdown = Shutdown::new();
    let server = std::sync::Arc::new(server(&registry, &shutdown));

    let (listener, addr) = common::ephemeral_listener().await;
    let running = server.clone();
    let handle = tokio::spawn(async move { running.serve(listener).await });

    let up = common::wait_for(Duration::from_secs(2), || async {
        reqwest::get(format!("http://{addr}{DEFAULT_METRICS_PATH}")).await.is_ok()
    })
    .await;
    assert!(up);
    assert_eq!(server.state(), ServerState::Running);

    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
    assert_eq!(server.state(), ServerState::Stopped);
}

#[tokio::test]
async fn test_repeated_trigger_is_harmless() {
    let registry = MetricsRegistry::new();
    let shutdown = Shutdown::new();
    let server = server(&registry, &shutdown);

    let (listener, _addr) = common::ephemeral_listener().await;
    let handle = tokio::spawn(async move { server.serve(listener).await });

    shutdown.trigger();
    shutdown.trigger();
    shutdown.trigger();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_serve_twice_is_rejected() {
    let registry = MetricsRegistry::new();
    let shutdown = Shutdown::new();
    let server = server(&registry, &shutdown);

    shutdown.trigger();
    let (listener, _) = common::ephemeral_listener().await;
    server.serve(listener).await.unwrap();

    let (listener, _) = common::ephemeral_listener().await;
    assert!(matches!(
        server.serve(listener).await,
        Err(MetricsServerError::AlreadyStarted)
    ));
}

#[tokio::test]
async fn test_concurrent_serve_runs_once() {
    let registry = MetricsRegistry::new();
    let shutdown = Shutdown::new();
    let server = server(&registry, &shutdown);

    let (first, _) = common::ephemeral_listener().await;
    let (second, _) = common::ephemeral_listener().await;

    let stop = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.trigger();
    };
    let (a, b, ()) = tokio::time::timeout(
        Duration::from_secs(5),
        async { tokio::join!(server.serve(first), server.serve(second), stop) },
    )
    .await
    .unwrap();

    let rejected = [&a, &b]
        .iter()
        .filter(|r| matches!(r, Err(MetricsServerError::AlreadyStarted)))
        .count();
    assert_eq!(rejected, 1);
    assert!(a.is_ok() || b.is_ok());
    assert_eq!(server.state(), ServerState::Stopped);
}
