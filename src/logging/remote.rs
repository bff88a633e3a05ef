//! Remote log forwarding.
//!
//! # Responsibilities
//! - Serialize records as JSON lines stamped with host, customer and version
//! - POST them to a collector without blocking the logging caller
//!
//! # Data Flow
//! ```text
//! Logger::log → RemoteLogHook::fire → bounded queue → delivery thread → POST endpoint
//! ```
//!
//! # Design Decisions
//! - The queue is bounded; when it is full the record is dropped and counted
//! - Delivery runs on its own thread with a current-thread runtime, so the
//!   hook works whether or not the caller is inside a tokio runtime
//! - Delivery failures are counted and traced, never returned to the caller
//! - `flush` blocks the caller until the queue drains or the timeout passes;
//!   the logger calls it before a fatal exit

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Map};
use tokio::sync::mpsc::{self, error::TrySendError};
use url::Url;

use super::backend::{Hook, Record};
use super::formatter::{timestamp, FormatError, Formatter};
use super::level::Level;
use super::LoggingError;

/// Records queued for delivery before new ones are dropped.
pub const REMOTE_QUEUE_CAPACITY: usize = 1024;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

const FLUSH_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// JSON line formatter for the remote collector.
#[derive(Debug, Clone)]
pub struct HttpLogFormatter {
    hostname: String,
    customer_id: String,
    version: String,
}

impl HttpLogFormatter {
    pub fn new(
        hostname: impl Into<String>,
        customer_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self, LoggingError> {
        let hostname = hostname.into();
        if hostname.trim().is_empty() {
            return Err(LoggingError::RemoteFormatter("hostname must not be empty"));
        }
        Ok(Self {
            hostname,
            customer_id: customer_id.into(),
            version: version.into(),
        })
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }
}

impl Formatter for HttpLogFormatter {
    fn format(&self, record: &Record) -> Result<Vec<u8>, FormatError> {
        let fields: Map<_, _> = record
            .fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        let line = json!({
            "timestamp": timestamp(record),
            "level": record.level.as_str(),
            "message": record.message,
            "hostname": self.hostname,
            "customerId": self.customer_id,
            "version": self.version,
            "fields": fields,
        });
        let mut bytes = serde_json::to_vec(&line)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

#[derive(Debug, Default)]
struct DeliveryStats {
    queued: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time delivery counters of a [`RemoteLogHook`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteLogStats {
    pub queued: u64,
    pub delivered: u64,
    pub failed: u64,
    pub dropped: u64,
}

/// Hook forwarding records to an HTTP collector.
pub struct RemoteLogHook {
    endpoint: Url,
    threshold: Level,
    formatter: HttpLogFormatter,
    sender: mpsc::Sender<Vec<u8>>,
    stats: Arc<DeliveryStats>,
}

impl fmt::Debug for RemoteLogHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteLogHook")
            .field("endpoint", &self.endpoint.as_str())
            .field("threshold", &self.threshold)
            .finish()
    }
}

impl RemoteLogHook {
    /// Start the delivery thread. Records at or above `threshold` are sent.
    pub fn new(
        endpoint: Url,
        formatter: HttpLogFormatter,
        threshold: Level,
    ) -> Result<Self, LoggingError> {
        let (sender, receiver) = mpsc::channel(REMOTE_QUEUE_CAPACITY);
        let stats = Arc::new(DeliveryStats::default());

        let worker = DeliveryWorker {
            endpoint: endpoint.clone(),
            receiver,
            stats: stats.clone(),
        };
        std::thread::Builder::new()
            .name("remote-log".to_string())
            .spawn(move || worker.run())
            .map_err(LoggingError::Worker)?;

        Ok(Self {
            endpoint,
            threshold,
            formatter,
            sender,
            stats,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn threshold(&self) -> Level {
        self.threshold
    }

    pub fn stats(&self) -> RemoteLogStats {
        RemoteLogStats {
            queued: self.stats.queued.load(Ordering::Relaxed),
            delivered: self.stats.delivered.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
            dropped: self.stats.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Hook for RemoteLogHook {
    fn enabled(&self, level: Level) -> bool {
        level >= self.threshold
    }

    fn fire(&self, record: &Record) {
        let line = match self.formatter.format(record) {
            Ok(line) => line,
            Err(e) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(error = %e, "Skipping remote log record");
                return;
            }
        };

        match self.sender.try_send(line) {
            Ok(()) => {
                self.stats.queued.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn flush(&self, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        loop {
            let stats = self.stats();
            if stats.delivered + stats.failed >= stats.queued {
                return;
            }
            if Instant::now() >= deadline {
                tracing::warn!(
                    pending = stats.queued - stats.delivered - stats.failed,
                    "Remote log flush timed out"
                );
                return;
            }
            std::thread::sleep(FLUSH_POLL_INTERVAL);
        }
    }
}

struct DeliveryWorker {
    endpoint: Url,
    receiver: mpsc::Receiver<Vec<u8>>,
    stats: Arc<DeliveryStats>,
}

impl DeliveryWorker {
    fn run(self) {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::error!(error = %e, "Failed to start remote log delivery runtime");
                return;
            }
        };
        runtime.block_on(self.deliver());
    }

    async fn deliver(mut self) {
        let client = match reqwest::Client::builder().timeout(DELIVERY_TIMEOUT).build() {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build remote log client");
                return;
            }
        };

        // Ends once every sender, i.e. the hook, is dropped.
        while let Some(line) = self.receiver.recv().await {
            let result = client
                .post(self.endpoint.clone())
                .header(CONTENT_TYPE, "application/json")
                .body(line)
                .send()
                .await
                .and_then(|response| response.error_for_status());

            match result {
                Ok(_) => {
                    self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(
                        endpoint = %self.endpoint,
                        error = %e,
                        "Remote log delivery failed"
                    );
                }
            }
        }
    }
}
