//! Leveled logger behavior across backends, including remote forwarding.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::{json, Value};

use svc_observability::config::{
    JsonFormatConfig, LoggerBackend, LoggingConfig, RemoteLoggingConfig,
};
use svc_observability::logging::{
    configure_logger_with, new_leveled_logger_with, remote_hook, BackendLogger, Fields, Hook,
    Level, LeveledLogger, Logger, LoggingError, NoopLogger, Record, RemoteLogStats,
};

mod common;

use common::SharedBuffer;

fn remote_config(endpoint: &str) -> RemoteLoggingConfig {
    RemoteLoggingConfig {
        enabled: true,
        endpoint: endpoint.to_string(),
        version: "2.4.1".into(),
        customer_id: "acme".into(),
        level: None,
    }
}

fn hostname() -> Result<String, LoggingError> {
    Ok("node-1".into())
}

fn json_lines(out: &SharedBuffer) -> Vec<Value> {
    out.lines()
        .iter()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_derived_logger_leaves_parent_untouched() {
    let out = SharedBuffer::default();
    let config = LoggingConfig {
        json: JsonFormatConfig {
            enabled: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let logger = configure_logger_with(Logger::builder().writer(out.clone()), &config, hostname)
        .unwrap()
        .build();
    let parent = BackendLogger::new(logger);

    let child = parent.with_field("lock", json!(7));
    let grandchild = child.with_fields(Fields::new().with("lock", 8).with("gate", "north"));
    parent.info("parent");
    child.info("child");
    grandchild.info("grandchild");

    let lines = json_lines(&out);
    assert_eq!(lines.len(), 3);
    assert!(lines[0].get("lock").is_none());
    assert_eq!(lines[1]["lock"], 7);
    assert!(lines[1].get("gate").is_none());
    assert_eq!(lines[2]["lock"], 8);
    assert_eq!(lines[2]["gate"], "north");
}

#[test]
fn test_noop_logger_is_chainable() {
    let logger = NoopLogger::shared();
    let derived = logger
        .with_field("a", json!(1))
        .with_fields(Fields::new().with("b", 2));

    derived.info("discarded");
    derived.fatal("discarded");
    derived.panic("discarded");
}

#[test]
fn test_fatal_runs_exit_handler() {
    let out = SharedBuffer::default();
    let exit_code = Arc::new(AtomicI32::new(-1));
    let seen = exit_code.clone();
    let logger = BackendLogger::new(
        Logger::builder()
            .writer(out.clone())
            .exit_handler(move |code| seen.store(code, Ordering::SeqCst))
            .build(),
    );

    logger.fatal("reservoir empty");

    assert_eq!(exit_code.load(Ordering::SeqCst), 1);
    assert!(out.contents().contains("level=fatal"));
}

#[test]
fn test_remote_config_errors() {
    assert!(matches!(
        remote_hook(&remote_config(""), hostname),
        Err(LoggingError::MissingRemoteEndpoint)
    ));
    assert!(matches!(
        remote_hook(&remote_config("::not-a-url"), hostname),
        Err(LoggingError::InvalidRemoteEndpoint { .. })
    ));
    assert!(matches!(
        remote_hook(&remote_config("http://127.0.0.1:9/logs"), || Err(
            LoggingError::HostnameUnresolved
        )),
        Err(LoggingError::HostnameUnresolved)
    ));
    assert!(remote_hook(&remote_config("http://127.0.0.1:9/logs"), hostname).is_ok());
}

#[tokio::test]
async fn test_remote_delivery() {
    let (addr, bodies) = common::start_mock_collector(StatusCode::OK).await;
    let hook = Arc::new(remote_hook(&remote_config(&format!("http://{addr}/logs")), hostname).unwrap());

    let logger = BackendLogger::new(
        Logger::builder()
            .writer(SharedBuffer::default())
            .hook(hook.clone())
            .build(),
    );
    logger.with_field("pump", json!(2)).error("pump failure");

    let delivered = common::wait_for(Duration::from_secs(5), || {
        let bodies = bodies.clone();
        async move { !bodies.lock().unwrap().is_empty() }
    })
    .await;
    assert!(delivered);

    let body = bodies.lock().unwrap()[0].clone();
    let value: Value = serde_json::from_str(body.trim_end()).unwrap();
    assert_eq!(value["level"], "error");
    assert_eq!(value["message"], "pump failure");
    assert_eq!(value["hostname"], "node-1");
    assert_eq!(value["customerId"], "acme");
    assert_eq!(value["version"], "2.4.1");
    assert_eq!(value["fields"]["pump"], 2);

    let stats_settled = common::wait_for(Duration::from_secs(5), || {
        let hook = hook.clone();
        async move { hook.stats().delivered == 1 }
    })
    .await;
    assert!(stats_settled);
}

// The exit handler blocks a worker while the hook flushes, so the collector
// needs a second one.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fatal_record_delivered_before_exit() {
    let (addr, bodies) = common::start_mock_collector(StatusCode::OK).await;
    let hook = Arc::new(remote_hook(&remote_config(&format!("http://{addr}/logs")), hostname).unwrap());

    let at_exit: Arc<std::sync::Mutex<Option<(i32, RemoteLogStats)>>> = Arc::default();
    let (observed, record_exit) = (hook.clone(), at_exit.clone());
    let logger = BackendLogger::new(
        Logger::builder()
            .writer(SharedBuffer::default())
            .hook(hook.clone())
            .exit_handler(move |code| {
                *record_exit.lock().unwrap() = Some((code, observed.stats()));
            })
            .build(),
    );

    logger.fatal("reservoir breached");

    let (code, stats) = at_exit.lock().unwrap().take().unwrap();
    assert_eq!(code, 1);
    assert_eq!(stats.queued, 1);
    assert_eq!(stats.delivered, 1);

    let body = bodies.lock().unwrap()[0].clone();
    let value: Value = serde_json::from_str(body.trim_end()).unwrap();
    assert_eq!(value["level"], "fatal");
    assert_eq!(value["message"], "reservoir breached");
}

#[tokio::test]
async fn test_tracing_backend_forwards_remote() {
    let (addr, bodies) = common::start_mock_collector(StatusCode::OK).await;
    let config = LoggingConfig {
        backend: LoggerBackend::Tracing,
        json: JsonFormatConfig {
            level: "warn".into(),
            ..Default::default()
        },
        remote: remote_config(&format!("http://{addr}/logs")),
        ..Default::default()
    };
    let logger = new_leveled_logger_with(&config, hostname).unwrap();

    logger.info("below threshold");
    logger.with_field("gate", json!("north")).error("gate jammed");

    let delivered = common::wait_for(Duration::from_secs(5), || {
        let bodies = bodies.clone();
        async move { !bodies.lock().unwrap().is_empty() }
    })
    .await;
    assert!(delivered);

    // Give a stray below-threshold record time to show up.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let bodies = bodies.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    let value: Value = serde_json::from_str(bodies[0].trim_end()).unwrap();
    assert_eq!(value["level"], "error");
    assert_eq!(value["message"], "gate jammed");
    assert_eq!(value["hostname"], "node-1");
    assert_eq!(value["fields"]["gate"], "north");
}

#[tokio::test]
async fn test_remote_failure_is_not_propagated() {
    let (addr, bodies) = common::start_mock_collector(StatusCode::SERVICE_UNAVAILABLE).await;
    let hook = Arc::new(remote_hook(&remote_config(&format!("http://{addr}/logs")), hostname).unwrap());

    let out = SharedBuffer::default();
    let logger = BackendLogger::new(
        Logger::builder()
            .writer(out.clone())
            .hook(hook.clone())
            .build(),
    );
    logger.warn("collector down");

    // Local output is unaffected by the remote failure.
    assert!(out.contents().contains("collector down"));

    let failed = common::wait_for(Duration::from_secs(5), || {
        let hook = hook.clone();
        async move { hook.stats().failed == 1 }
    })
    .await;
    assert!(failed);
    assert_eq!(bodies.lock().unwrap().len(), 1);
    assert_eq!(hook.stats().delivered, 0);
}

#[test]
fn test_threshold_applies_before_hooks() {
    struct Recorder(std::sync::Mutex<Vec<Level>>);

    impl Hook for Recorder {
        fn enabled(&self, _level: Level) -> bool {
            true
        }

        fn fire(&self, record: &Record) {
            self.0.lock().unwrap().push(record.level);
        }
    }

    let hook = Arc::new(Recorder(std::sync::Mutex::new(Vec::new())));
    let logger = BackendLogger::new(
        Logger::builder()
            .level(Level::Warn)
            .writer(SharedBuffer::default())
            .hook(hook.clone())
            .build(),
    );

    logger.debug("dropped");
    logger.info("dropped");
    logger.warn("kept");
    logger.error("kept");

    assert_eq!(*hook.0.lock().unwrap(), vec![Level::Warn, Level::Error]);
}
