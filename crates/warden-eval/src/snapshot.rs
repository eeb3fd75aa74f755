//! Metric snapshots and the collector boundary.
//!
//! A snapshot is the read-only view of metric windows one run evaluates
//! against. Evaluators share it without locking and hold no references to
//! it beyond their own `evaluate` call.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use warden_types::MetricWindow;

/// Where the orchestrator gets metric windows from.
///
/// Collectors are external collaborators; the core only sees this seam.
/// A metric absent from the returned map is a valid response meaning "no
/// data", not an error.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Collect windows for the named metrics, covering at least
    /// `[start, end)`.
    async fn collect(
        &self,
        metrics: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BTreeMap<String, MetricWindow>, String>;
}

/// The windows one evaluation run works against.
#[derive(Debug, Clone)]
pub struct MetricSnapshot {
    windows: BTreeMap<String, MetricWindow>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    missing: Vec<String>,
}

impl MetricSnapshot {
    /// Create an empty snapshot covering `[start, end)`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            windows: BTreeMap::new(),
            start,
            end,
            missing: Vec::new(),
        }
    }

    /// Requested window bounds.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.start, self.end)
    }

    /// Add a collected window, keyed by its metric name.
    pub fn insert(&mut self, window: MetricWindow) {
        self.windows.insert(window.metric().to_string(), window);
    }

    /// Window for a metric, if it was collected.
    pub fn window(&self, metric: &str) -> Option<&MetricWindow> {
        self.windows.get(metric)
    }

    /// Metric names present in the snapshot, in name order.
    pub fn metrics(&self) -> impl Iterator<Item = &str> {
        self.windows.keys().map(String::as_str)
    }

    /// Number of collected windows.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Whether no windows were collected.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Record a required metric the collectors could not provide.
    pub fn record_missing(&mut self, metric: impl Into<String>) {
        self.missing.push(metric.into());
    }

    /// Required metrics that were not collected.
    pub fn missing(&self) -> &[String] {
        &self.missing
    }
}
