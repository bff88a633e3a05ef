//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::post, Router};
use tokio::net::TcpListener;

/// In-memory log output shared between the logger and the test.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Bind an ephemeral port on loopback.
pub async fn ephemeral_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

#[derive(Clone)]
struct CollectorState {
    status: StatusCode,
    bodies: Arc<Mutex<Vec<String>>>,
}

/// Start a mock log collector answering `POST /logs` with `status`.
///
/// Returns the collector address and the bodies it has received.
pub async fn start_mock_collector(status: StatusCode) -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let (listener, addr) = ephemeral_listener().await;
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let state = CollectorState {
        status,
        bodies: bodies.clone(),
    };

    let app = Router::new()
        .route(
            "/logs",
            post(|State(state): State<CollectorState>, body: String| async move {
                state.bodies.lock().unwrap().push(body);
                state.status
            }),
        )
        .with_state(state);

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, bodies)
}

/// Poll `check` until it returns true or `timeout` elapses.
pub async fn wait_for<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
