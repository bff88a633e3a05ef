//! In-process metrics aggregation.
//!
//! # Responsibilities
//! - Aggregate counters, gauges and timers keyed by name + label set
//! - Produce snapshots of every series for inspection
//! - Render the Prometheus text exposition format
//!
//! # Design Decisions
//! - Owned by the composition root and passed by handle; no global recorder
//! - Sharded series table (DashMap); writers to different series never contend
//! - Each accumulator update is atomic: counters/gauges use atomics, timers a
//!   per-series mutex so count, sum, min and max always move together
//! - Series are never deleted; label cardinality is the caller's concern

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use metrics::{Key, Metadata, Recorder};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

use super::labels::LabelSet;

static METADATA: Metadata<'static> =
    Metadata::new(module_path!(), metrics::Level::INFO, Some(module_path!()));

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct SeriesKey {
    name: String,
    labels: LabelSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeriesKind {
    Counter,
    Gauge,
    Timer,
}

/// Aggregated state of one timer series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerSummary {
    pub count: u64,
    pub sum: Duration,
    pub min: Duration,
    pub max: Duration,
}

impl TimerSummary {
    fn observe(&mut self, elapsed: Duration) {
        if self.count == 0 || elapsed < self.min {
            self.min = elapsed;
        }
        if elapsed > self.max {
            self.max = elapsed;
        }
        self.count += 1;
        self.sum += elapsed;
    }
}

/// The aggregated value of a series at snapshot time.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesValue {
    Counter(u64),
    Gauge(f64),
    Timer(TimerSummary),
}

/// One series as seen by [`MetricsRegistry::snapshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSnapshot {
    pub name: String,
    pub labels: LabelSet,
    pub value: SeriesValue,
}

enum Accumulator {
    Counter {
        total: AtomicU64,
        handle: metrics::Counter,
    },
    Gauge {
        bits: AtomicU64,
        handle: metrics::Gauge,
    },
    Timer {
        state: Mutex<TimerSummary>,
        handle: metrics::Histogram,
    },
}

impl Accumulator {
    fn kind(&self) -> SeriesKind {
        match self {
            Accumulator::Counter { .. } => SeriesKind::Counter,
            Accumulator::Gauge { .. } => SeriesKind::Gauge,
            Accumulator::Timer { .. } => SeriesKind::Timer,
        }
    }

    fn value(&self) -> SeriesValue {
        match self {
            Accumulator::Counter { total, .. } => SeriesValue::Counter(total.load(Ordering::Relaxed)),
            Accumulator::Gauge { bits, .. } => {
                SeriesValue::Gauge(f64::from_bits(bits.load(Ordering::Relaxed)))
            }
            Accumulator::Timer { state, .. } => {
                SeriesValue::Timer(*state.lock().unwrap_or_else(PoisonError::into_inner))
            }
        }
    }
}

struct RegistryInner {
    series: DashMap<SeriesKey, Arc<Accumulator>>,
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

/// Process-wide metrics aggregator.
///
/// Cheap to clone; clones share the same series table.
#[derive(Clone)]
pub struct MetricsRegistry {
    inner: Arc<RegistryInner>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        Self {
            inner: Arc::new(RegistryInner {
                series: DashMap::new(),
                recorder,
                handle,
            }),
        }
    }

    /// Increase a counter by one, creating the series on first use.
    pub fn increment_counter(&self, name: &str, labels: &LabelSet) {
        self.add_counter(name, labels, 1);
    }

    /// Increase a counter by `value`.
    pub fn add_counter(&self, name: &str, labels: &LabelSet, value: u64) {
        if let Some(acc) = self.series(SeriesKind::Counter, name, labels) {
            if let Accumulator::Counter { total, handle } = acc.as_ref() {
                total.fetch_add(value, Ordering::Relaxed);
                handle.increment(value);
            }
        }
    }

    /// Set a gauge to `value`.
    pub fn set_gauge(&self, name: &str, labels: &LabelSet, value: f64) {
        if let Some(acc) = self.series(SeriesKind::Gauge, name, labels) {
            if let Accumulator::Gauge { bits, handle } = acc.as_ref() {
                bits.store(value.to_bits(), Ordering::Relaxed);
                handle.set(value);
            }
        }
    }

    /// Add one observation to a timer series.
    pub fn record_duration(&self, name: &str, labels: &LabelSet, elapsed: Duration) {
        if let Some(acc) = self.series(SeriesKind::Timer, name, labels) {
            if let Accumulator::Timer { state, handle } = acc.as_ref() {
                state
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .observe(elapsed);
                handle.record(elapsed.as_secs_f64());
            }
        }
    }

    /// Record the time elapsed since `start`.
    pub fn measure_since(&self, name: &str, labels: &LabelSet, start: Instant) {
        self.record_duration(name, labels, start.elapsed());
    }

    /// Every series, ordered by name then labels.
    ///
    /// The table is only held long enough to collect series handles; values
    /// are read lazily as the iterator advances.
    pub fn snapshot(&self) -> impl Iterator<Item = SeriesSnapshot> {
        let mut entries: Vec<(SeriesKey, Arc<Accumulator>)> = self
            .inner
            .series
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        entries.into_iter().map(|(key, acc)| SeriesSnapshot {
            name: key.name,
            labels: key.labels,
            value: acc.value(),
        })
    }

    /// Render every series in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        self.inner.handle.render()
    }

    /// Number of distinct series.
    pub fn len(&self) -> usize {
        self.inner.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.series.is_empty()
    }

    fn series(&self, kind: SeriesKind, name: &str, labels: &LabelSet) -> Option<Arc<Accumulator>> {
        let key = SeriesKey {
            name: name.to_string(),
            labels: labels.clone(),
        };

        let acc = match self.inner.series.get(&key).map(|r| Arc::clone(r.value())) {
            Some(acc) => acc,
            None => Arc::clone(
                self.inner
                    .series
                    .entry(key)
                    .or_insert_with(|| Arc::new(self.create(kind, name, labels)))
                    .value(),
            ),
        };

        if acc.kind() != kind {
            tracing::warn!(
                metric = name,
                labels = %labels,
                expected = ?acc.kind(),
                requested = ?kind,
                "Metric series reused with a different kind, dropping sample"
            );
            return None;
        }
        Some(acc)
    }

    fn create(&self, kind: SeriesKind, name: &str, labels: &LabelSet) -> Accumulator {
        let key = Key::from_parts(name.to_string(), labels.to_metric_labels());
        let recorder = &self.inner.recorder;
        match kind {
            SeriesKind::Counter => Accumulator::Counter {
                total: AtomicU64::new(0),
                handle: recorder.register_counter(&key, &METADATA),
            },
            SeriesKind::Gauge => Accumulator::Gauge {
                bits: AtomicU64::new(0f64.to_bits()),
                handle: recorder.register_gauge(&key, &METADATA),
            },
            SeriesKind::Timer => Accumulator::Timer {
                state: Mutex::new(TimerSummary::default()),
                handle: recorder.register_histogram(&key, &METADATA),
            },
        }
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("series", &self.inner.series.len())
            .finish()
    }
}
