//! A single metric observation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped numeric observation of a named metric.
///
/// Samples are immutable once recorded; collectors hand the core ordered
/// sequences of them, one sequence per metric name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Metric name this observation belongs to.
    pub metric: String,

    /// Observed value.
    pub value: f64,

    /// When the observation was made.
    pub timestamp: DateTime<Utc>,
}

impl MetricSample {
    /// Create a new sample.
    pub fn new(metric: impl Into<String>, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            metric: metric.into(),
            value,
            timestamp,
        }
    }
}
