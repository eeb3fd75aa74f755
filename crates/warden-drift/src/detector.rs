//! Baseline-vs-current drift detection.
//!
//! The detector compares the value distribution of a current window
//! against a baseline window for the same metric. It is stateless per
//! call: baseline refresh is an explicit decision made by the caller,
//! never something the detector does behind its back.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use warden_types::MetricWindow;

use crate::error::{DetectResult, DriftError};

/// Floor for bin proportions so empty bins never produce a zero log.
const PSI_EPSILON: f64 = 1e-6;

/// How a drift score is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftMethod {
    /// Distribution distance computed by the detector itself.
    Statistical,
    /// Score delegated to an injected model-backed scorer.
    MlModel,
}

impl std::fmt::Display for DriftMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriftMethod::Statistical => write!(f, "statistical"),
            DriftMethod::MlModel => write!(f, "ml_model"),
        }
    }
}

/// Distribution distance used by the statistical method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DriftStatistic {
    /// Population stability index over shared uniform bins.
    #[default]
    Psi,
    /// Two-sample Kolmogorov-Smirnov distance (max ECDF gap).
    KolmogorovSmirnov,
}

impl std::fmt::Display for DriftStatistic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriftStatistic::Psi => write!(f, "psi"),
            DriftStatistic::KolmogorovSmirnov => write!(f, "ks"),
        }
    }
}

/// Configuration for drift detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftConfig {
    /// Minimum sample count per window below which detection fails with
    /// `InsufficientData` instead of returning a spurious low score.
    pub min_samples: usize,

    /// Number of histogram bins for the PSI statistic.
    pub bins: usize,

    /// Distance statistic used by the statistical method.
    pub statistic: DriftStatistic,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            min_samples: 30,
            bins: 10,
            statistic: DriftStatistic::Psi,
        }
    }
}

/// Outcome of one drift check. Immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftResult {
    /// Metric the windows cover.
    pub metric: String,

    /// Method that produced the score.
    pub method: DriftMethod,

    /// Distance statistic, present for the statistical method only.
    pub statistic: Option<DriftStatistic>,

    /// Computed drift score.
    pub score: f64,

    /// Threshold the score was compared against.
    pub threshold: f64,

    /// Whether the score exceeded the threshold.
    pub drifted: bool,

    /// Sample counts the score was computed from.
    pub baseline_samples: usize,
    pub current_samples: usize,
}

/// Scoring seam for the model-based method.
///
/// The detector never runs model inference itself; a scorer wraps
/// whatever anomaly or drift model the deployment provides and returns a
/// score in `[0, 1]`.
#[async_trait]
pub trait DriftScorer: Send + Sync {
    /// Score the drift between two windows. Values outside `[0, 1]` are
    /// clamped by the detector.
    async fn score(&self, baseline: &MetricWindow, current: &MetricWindow)
        -> Result<f64, String>;

    /// Description for logs and reports.
    fn description(&self) -> &str {
        "model-based drift scorer"
    }
}

/// Scorer built from a closure, for deployments that wrap a model call
/// without defining a dedicated type.
pub struct ScorerFn<F> {
    score_fn: F,
}

impl<F> ScorerFn<F>
where
    F: Fn(&MetricWindow, &MetricWindow) -> Result<f64, String> + Send + Sync,
{
    pub fn new(score_fn: F) -> Self {
        Self { score_fn }
    }
}

#[async_trait]
impl<F> DriftScorer for ScorerFn<F>
where
    F: Fn(&MetricWindow, &MetricWindow) -> Result<f64, String> + Send + Sync,
{
    async fn score(
        &self,
        baseline: &MetricWindow,
        current: &MetricWindow,
    ) -> Result<f64, String> {
        (self.score_fn)(baseline, current)
    }
}

/// Compares a current window against a baseline and flags drift.
#[derive(Clone)]
pub struct DriftDetector {
    config: DriftConfig,
    scorer: Option<Arc<dyn DriftScorer>>,
}

impl DriftDetector {
    /// Create a detector for statistical methods only.
    pub fn new(config: DriftConfig) -> Self {
        Self {
            config,
            scorer: None,
        }
    }

    /// Create a detector that can also delegate to a model-backed scorer.
    pub fn with_scorer(config: DriftConfig, scorer: Arc<dyn DriftScorer>) -> Self {
        Self {
            config,
            scorer: Some(scorer),
        }
    }

    /// Whether a scorer is available for the `MlModel` method.
    pub fn has_scorer(&self) -> bool {
        self.scorer.is_some()
    }

    /// Compare `current` against `baseline` and apply the threshold.
    pub async fn detect(
        &self,
        baseline: &MetricWindow,
        current: &MetricWindow,
        method: DriftMethod,
        threshold: f64,
    ) -> DetectResult<DriftResult> {
        if baseline.metric() != current.metric() {
            return Err(DriftError::MetricMismatch {
                baseline: baseline.metric().to_string(),
                current: current.metric().to_string(),
            });
        }
        self.require_samples(baseline, "baseline")?;
        self.require_samples(current, "current")?;

        let (score, statistic) = match method {
            DriftMethod::Statistical => {
                let score = match self.config.statistic {
                    DriftStatistic::Psi => self.population_stability_index(baseline, current),
                    DriftStatistic::KolmogorovSmirnov => {
                        self.kolmogorov_smirnov(baseline, current)
                    }
                };
                (score, Some(self.config.statistic))
            }
            DriftMethod::MlModel => {
                let scorer = self.scorer.as_ref().ok_or(DriftError::MissingScorer)?;
                let raw = scorer.score(baseline, current).await.map_err(|reason| {
                    DriftError::Scorer {
                        metric: current.metric().to_string(),
                        reason,
                    }
                })?;
                (raw.clamp(0.0, 1.0), None)
            }
        };

        let drifted = score > threshold;
        debug!(
            metric = %current.metric(),
            method = %method,
            score,
            threshold,
            drifted,
            "Computed drift score"
        );

        Ok(DriftResult {
            metric: current.metric().to_string(),
            method,
            statistic,
            score,
            threshold,
            drifted,
            baseline_samples: baseline.len(),
            current_samples: current.len(),
        })
    }

    fn require_samples(&self, window: &MetricWindow, side: &'static str) -> DetectResult<()> {
        if window.len() < self.config.min_samples {
            return Err(DriftError::InsufficientData {
                metric: window.metric().to_string(),
                side,
                needed: self.config.min_samples,
                got: window.len(),
            });
        }
        Ok(())
    }

    /// PSI over uniform bins spanning the combined value range. Bin
    /// proportions are floored at a small epsilon so bins empty on one
    /// side do not blow up the log term.
    fn population_stability_index(
        &self,
        baseline: &MetricWindow,
        current: &MetricWindow,
    ) -> f64 {
        let lo = baseline
            .values()
            .chain(current.values())
            .fold(f64::INFINITY, f64::min);
        let hi = baseline
            .values()
            .chain(current.values())
            .fold(f64::NEG_INFINITY, f64::max);
        if !(hi > lo) {
            // Every sample on both sides carries the same value.
            return 0.0;
        }

        let bins = self.config.bins.max(2);
        let width = (hi - lo) / bins as f64;
        let bin_of = |v: f64| (((v - lo) / width) as usize).min(bins - 1);

        let mut baseline_counts = vec![0usize; bins];
        for v in baseline.values() {
            baseline_counts[bin_of(v)] += 1;
        }
        let mut current_counts = vec![0usize; bins];
        for v in current.values() {
            current_counts[bin_of(v)] += 1;
        }

        let baseline_total = baseline.len() as f64;
        let current_total = current.len() as f64;
        baseline_counts
            .iter()
            .zip(&current_counts)
            .map(|(&b, &c)| {
                let p = (b as f64 / baseline_total).max(PSI_EPSILON);
                let q = (c as f64 / current_total).max(PSI_EPSILON);
                (q - p) * (q / p).ln()
            })
            .sum()
    }

    /// Two-sample KS distance: the maximum gap between the empirical
    /// CDFs, with ties consumed on both sides before each measurement.
    fn kolmogorov_smirnov(&self, baseline: &MetricWindow, current: &MetricWindow) -> f64 {
        let sort = |w: &MetricWindow| {
            let mut v: Vec<f64> = w.values().collect();
            v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            v
        };
        let a = sort(baseline);
        let b = sort(current);
        let (na, nb) = (a.len() as f64, b.len() as f64);

        let mut i = 0;
        let mut j = 0;
        let mut distance: f64 = 0.0;
        while i < a.len() && j < b.len() {
            let x = a[i].min(b[j]);
            while i < a.len() && a[i] <= x {
                i += 1;
            }
            while j < b.len() && b[j] <= x {
                j += 1;
            }
            distance = distance.max((i as f64 / na - j as f64 / nb).abs());
        }
        distance
    }
}

impl Default for DriftDetector {
    fn default() -> Self {
        Self::new(DriftConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn window_of(values: impl IntoIterator<Item = f64>) -> MetricWindow {
        let start = t0();
        let end = start + chrono::Duration::hours(1);
        MetricWindow::from_observations(
            "prediction_confidence",
            start,
            end,
            values
                .into_iter()
                .enumerate()
                .map(|(i, v)| (start + chrono::Duration::seconds(i as i64), v)),
        )
        .unwrap()
    }

    /// Deterministic spread of values cycling through `0..steps`, shifted
    /// by `offset`.
    fn cycling(count: usize, steps: usize, offset: f64) -> MetricWindow {
        window_of((0..count).map(|i| (i % steps) as f64 + offset))
    }

    #[tokio::test]
    async fn test_minimum_sample_floor() {
        let detector = DriftDetector::default();
        let baseline = cycling(29, 10, 0.0);
        let current = cycling(100, 10, 0.0);

        let err = detector
            .detect(&baseline, &current, DriftMethod::Statistical, 0.2)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DriftError::InsufficientData {
                side: "baseline",
                got: 29,
                needed: 30,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_psi_stable_distribution() {
        let detector = DriftDetector::default();
        let baseline = cycling(200, 10, 0.0);
        let current = cycling(200, 10, 0.0);

        let result = detector
            .detect(&baseline, &current, DriftMethod::Statistical, 0.2)
            .await
            .unwrap();
        assert_eq!(result.statistic, Some(DriftStatistic::Psi));
        assert!(result.score < 0.01, "stable PSI was {}", result.score);
        assert!(!result.drifted);
    }

    #[tokio::test]
    async fn test_psi_shifted_distribution() {
        let detector = DriftDetector::default();
        let baseline = cycling(200, 10, 0.0);
        let current = cycling(200, 10, 8.0);

        let result = detector
            .detect(&baseline, &current, DriftMethod::Statistical, 0.2)
            .await
            .unwrap();
        assert!(result.score > 0.2, "shifted PSI was {}", result.score);
        assert!(result.drifted);
    }

    #[tokio::test]
    async fn test_psi_constant_values() {
        let detector = DriftDetector::default();
        let baseline = window_of(std::iter::repeat(1.0).take(50));
        let current = window_of(std::iter::repeat(1.0).take(50));

        let result = detector
            .detect(&baseline, &current, DriftMethod::Statistical, 0.2)
            .await
            .unwrap();
        assert_eq!(result.score, 0.0);
    }

    #[tokio::test]
    async fn test_ks_disjoint_distributions() {
        let detector = DriftDetector::new(DriftConfig {
            statistic: DriftStatistic::KolmogorovSmirnov,
            ..DriftConfig::default()
        });
        let baseline = cycling(100, 10, 0.0);
        let current = cycling(100, 10, 100.0);

        let result = detector
            .detect(&baseline, &current, DriftMethod::Statistical, 0.1)
            .await
            .unwrap();
        assert!((result.score - 1.0).abs() < 1e-9);
        assert!(result.drifted);
    }

    #[tokio::test]
    async fn test_ks_identical_distributions() {
        let detector = DriftDetector::new(DriftConfig {
            statistic: DriftStatistic::KolmogorovSmirnov,
            ..DriftConfig::default()
        });
        let baseline = cycling(100, 10, 0.0);
        let current = cycling(100, 10, 0.0);

        let result = detector
            .detect(&baseline, &current, DriftMethod::Statistical, 0.1)
            .await
            .unwrap();
        assert!(result.score < 1e-9);
        assert!(!result.drifted);
    }

    #[tokio::test]
    async fn test_ml_model_delegates_to_scorer() {
        let scorer = Arc::new(ScorerFn::new(|_b: &MetricWindow, _c: &MetricWindow| Ok(0.8)));
        let detector = DriftDetector::with_scorer(DriftConfig::default(), scorer);
        let baseline = cycling(50, 10, 0.0);
        let current = cycling(50, 10, 0.0);

        let result = detector
            .detect(&baseline, &current, DriftMethod::MlModel, 0.5)
            .await
            .unwrap();
        assert_eq!(result.method, DriftMethod::MlModel);
        assert_eq!(result.statistic, None);
        assert!((result.score - 0.8).abs() < 1e-9);
        assert!(result.drifted);
    }

    #[tokio::test]
    async fn test_ml_model_clamps_score() {
        let scorer = Arc::new(ScorerFn::new(|_b: &MetricWindow, _c: &MetricWindow| Ok(3.5)));
        let detector = DriftDetector::with_scorer(DriftConfig::default(), scorer);
        let baseline = cycling(50, 10, 0.0);
        let current = cycling(50, 10, 0.0);

        let result = detector
            .detect(&baseline, &current, DriftMethod::MlModel, 0.5)
            .await
            .unwrap();
        assert_eq!(result.score, 1.0);
    }

    #[tokio::test]
    async fn test_ml_model_without_scorer() {
        let detector = DriftDetector::default();
        let baseline = cycling(50, 10, 0.0);
        let current = cycling(50, 10, 0.0);

        let err = detector
            .detect(&baseline, &current, DriftMethod::MlModel, 0.5)
            .await
            .unwrap_err();
        assert_eq!(err, DriftError::MissingScorer);
    }

    #[tokio::test]
    async fn test_scorer_failure_is_reported() {
        let scorer = Arc::new(ScorerFn::new(|_b: &MetricWindow, _c: &MetricWindow| {
            Err("model endpoint unreachable".to_string())
        }));
        let detector = DriftDetector::with_scorer(DriftConfig::default(), scorer);
        let baseline = cycling(50, 10, 0.0);
        let current = cycling(50, 10, 0.0);

        let err = detector
            .detect(&baseline, &current, DriftMethod::MlModel, 0.5)
            .await
            .unwrap_err();
        assert!(matches!(err, DriftError::Scorer { .. }));
    }

    #[tokio::test]
    async fn test_metric_mismatch() {
        let detector = DriftDetector::default();
        let baseline = cycling(50, 10, 0.0);
        let start = t0();
        let current = MetricWindow::from_observations(
            "latency_ms",
            start,
            start + chrono::Duration::hours(1),
            (0..50).map(|i| (start + chrono::Duration::seconds(i), i as f64)),
        )
        .unwrap();

        let err = detector
            .detect(&baseline, &current, DriftMethod::Statistical, 0.2)
            .await
            .unwrap_err();
        assert!(matches!(err, DriftError::MetricMismatch { .. }));
    }

    #[tokio::test]
    async fn test_detect_is_idempotent() {
        let detector = DriftDetector::default();
        let baseline = cycling(100, 10, 0.0);
        let current = cycling(100, 10, 2.0);

        let a = detector
            .detect(&baseline, &current, DriftMethod::Statistical, 0.2)
            .await
            .unwrap();
        let b = detector
            .detect(&baseline, &current, DriftMethod::Statistical, 0.2)
            .await
            .unwrap();
        assert_eq!(a, b);
    }
}
