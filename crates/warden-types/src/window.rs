//! Time-bounded metric windows and aggregation over them.
//!
//! A window holds the observations for exactly one metric inside a
//! half-open interval `[start, end)`. Windows are the unit of exchange
//! between collectors and the evaluation core: evaluators only ever read
//! them, so a snapshot of windows can be shared across evaluators without
//! locking.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WindowError;
use crate::sample::MetricSample;
use crate::slo::SloObjective;

/// Aggregations a window can compute over its samples.
///
/// A closed set rather than caller-supplied closures, so dispatch stays
/// exhaustive and aggregation requests can travel through configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Arithmetic mean of all sample values.
    Mean,
    /// Nearest-rank percentile, `p` in `[0, 1]`.
    Percentile(f64),
    /// Number of samples.
    Count,
    /// Number of samples strictly above the given value.
    CountAbove(f64),
    /// Samples per second over the declared window span.
    Rate,
}

impl std::fmt::Display for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Aggregation::Mean => write!(f, "mean"),
            Aggregation::Percentile(p) => write!(f, "p{:02.0}", p * 100.0),
            Aggregation::Count => write!(f, "count"),
            Aggregation::CountAbove(v) => write!(f, "count_above_{v}"),
            Aggregation::Rate => write!(f, "rate"),
        }
    }
}

/// Ordered observations for one metric, bounded by `[start, end)`.
///
/// Invariants: every sample's timestamp falls inside the bounds, and
/// insertion order is chronological order. Both are enforced at `push`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricWindow {
    metric: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    samples: Vec<MetricSample>,
}

impl MetricWindow {
    /// Create an empty window for a metric.
    pub fn new(metric: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            metric: metric.into(),
            start,
            end,
            samples: Vec::new(),
        }
    }

    /// Build a window from an ordered `(timestamp, value)` sequence, the
    /// shape collectors hand over.
    pub fn from_observations(
        metric: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        observations: impl IntoIterator<Item = (DateTime<Utc>, f64)>,
    ) -> Result<Self, WindowError> {
        let metric = metric.into();
        let mut window = Self::new(metric.clone(), start, end);
        for (timestamp, value) in observations {
            window.push(MetricSample::new(metric.clone(), value, timestamp))?;
        }
        Ok(window)
    }

    /// Metric name this window covers.
    pub fn metric(&self) -> &str {
        &self.metric
    }

    /// Inclusive lower bound.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive upper bound.
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Declared span of the window.
    pub fn span(&self) -> ChronoDuration {
        self.end - self.start
    }

    /// Number of samples recorded.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the window holds no samples.
    ///
    /// An empty window means "no data", never "zero": aggregations over it
    /// fail with [`WindowError::Empty`] so callers surface `skipped`
    /// instead of a fabricated value.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Recorded samples, in chronological order.
    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    /// Sample values, in chronological order.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.value)
    }

    /// Append a sample, rejecting anything that would break the window
    /// invariants.
    pub fn push(&mut self, sample: MetricSample) -> Result<(), WindowError> {
        if sample.metric != self.metric {
            return Err(WindowError::MetricMismatch {
                window_metric: self.metric.clone(),
                sample_metric: sample.metric,
            });
        }
        if sample.timestamp < self.start || sample.timestamp >= self.end {
            return Err(WindowError::OutOfWindow {
                metric: self.metric.clone(),
                timestamp: sample.timestamp,
                start: self.start,
                end: self.end,
            });
        }
        if let Some(last) = self.samples.last() {
            if sample.timestamp < last.timestamp {
                return Err(WindowError::OutOfOrder {
                    metric: self.metric.clone(),
                    timestamp: sample.timestamp,
                });
            }
        }
        self.samples.push(sample);
        Ok(())
    }

    /// Compute an aggregate over all contained samples.
    pub fn aggregate(&self, aggregation: Aggregation) -> Result<f64, WindowError> {
        if self.samples.is_empty() {
            return Err(WindowError::Empty {
                metric: self.metric.clone(),
            });
        }
        let value = match aggregation {
            Aggregation::Mean => {
                self.values().sum::<f64>() / self.samples.len() as f64
            }
            Aggregation::Percentile(p) => self.percentile_unchecked(p),
            Aggregation::Count => self.samples.len() as f64,
            Aggregation::CountAbove(bound) => {
                self.values().filter(|v| *v > bound).count() as f64
            }
            Aggregation::Rate => {
                let span_secs = self.span().num_milliseconds() as f64 / 1_000.0;
                if span_secs > 0.0 {
                    self.samples.len() as f64 / span_secs
                } else {
                    0.0
                }
            }
        };
        Ok(value)
    }

    /// Arithmetic mean of all sample values.
    pub fn mean(&self) -> Result<f64, WindowError> {
        self.aggregate(Aggregation::Mean)
    }

    /// Nearest-rank percentile of all sample values, `p` in `[0, 1]`.
    pub fn percentile(&self, p: f64) -> Result<f64, WindowError> {
        self.aggregate(Aggregation::Percentile(p))
    }

    fn percentile_unchecked(&self, p: f64) -> f64 {
        let mut sorted: Vec<f64> = self.values().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let p = p.clamp(0.0, 1.0);
        let idx = ((sorted.len() as f64 * p).ceil() as usize).saturating_sub(1);
        sorted[idx.min(sorted.len() - 1)]
    }

    /// Fraction of samples violating an SLO objective.
    ///
    /// For ratio objectives the samples are success indicators, so the
    /// violation rate is `1 − mean`. For upper-bound objectives it is the
    /// fraction of samples exceeding the bound.
    pub fn violation_rate(&self, objective: &SloObjective) -> Result<f64, WindowError> {
        match objective {
            SloObjective::Ratio { .. } => Ok((1.0 - self.mean()?).clamp(0.0, 1.0)),
            SloObjective::UpperBound { bound, .. } => {
                let above = self.aggregate(Aggregation::CountAbove(*bound))?;
                Ok(above / self.samples.len() as f64)
            }
        }
    }

    /// New window covering the intersection of `[start, end)` with this
    /// window's bounds, containing the samples that fall inside it.
    pub fn slice(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> MetricWindow {
        let s = start.max(self.start);
        let e = end.min(self.end).max(s);
        let samples = self
            .samples
            .iter()
            .filter(|sample| sample.timestamp >= s && sample.timestamp < e)
            .cloned()
            .collect();
        MetricWindow {
            metric: self.metric.clone(),
            start: s,
            end: e,
            samples,
        }
    }
}
