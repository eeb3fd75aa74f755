//! Distribution drift checks with an explicitly refreshed baseline store.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, instrument};

use warden_drift::{DriftDetector, DriftError};
use warden_types::{EvaluationResult, EvaluatorKind, MetricWindow, ThresholdResult};

use super::Evaluator;
use crate::config::DriftSpec;
use crate::error::{EvalError, EvalResult};
use crate::snapshot::MetricSnapshot;

/// Invokes the drift detector for each configured metric/method pair.
///
/// Baselines are the one sanctioned piece of cross-run state in the
/// engine. They are owned here and replaced only through
/// [`refresh_baseline`](DriftEvaluator::refresh_baseline) — a run never
/// promotes its current window to baseline on its own.
pub struct DriftEvaluator {
    name: String,
    detector: DriftDetector,
    specs: Vec<DriftSpec>,
    baselines: DashMap<String, MetricWindow>,
}

impl DriftEvaluator {
    pub fn new(name: impl Into<String>, detector: DriftDetector, specs: Vec<DriftSpec>) -> Self {
        Self {
            name: name.into(),
            detector,
            specs,
            baselines: DashMap::new(),
        }
    }

    /// Replace the baseline for the window's metric.
    pub fn refresh_baseline(&self, window: MetricWindow) {
        debug!(
            evaluator = %self.name,
            metric = %window.metric(),
            samples = window.len(),
            "Refreshing drift baseline"
        );
        self.baselines.insert(window.metric().to_string(), window);
    }

    /// Current baseline for a metric, if one was recorded.
    pub fn baseline(&self, metric: &str) -> Option<MetricWindow> {
        self.baselines.get(metric).map(|w| w.clone())
    }
}

#[async_trait]
impl Evaluator for DriftEvaluator {
    fn kind(&self) -> EvaluatorKind {
        EvaluatorKind::Drift
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn required_metrics(&self) -> Vec<String> {
        self.specs.iter().map(|s| s.metric.clone()).collect()
    }

    #[instrument(skip(self, snapshot), fields(evaluator = %self.name))]
    async fn evaluate(&self, snapshot: &MetricSnapshot) -> EvalResult<EvaluationResult> {
        let mut result = EvaluationResult::new(self.kind(), &self.name);

        for spec in &self.specs {
            for method in &spec.detection_methods {
                let condition = format!("{} {}", spec.metric, method);
                let Some(current) = snapshot.window(&spec.metric) else {
                    result.record_threshold(
                        condition,
                        ThresholdResult::skipped(
                            &spec.metric,
                            spec.adaptation_threshold,
                            "metric not collected",
                        ),
                    );
                    continue;
                };
                let baseline = match self.baselines.get(&spec.metric) {
                    Some(window) => window.clone(),
                    None => {
                        result.record_threshold(
                            condition,
                            ThresholdResult::skipped(
                                &spec.metric,
                                spec.adaptation_threshold,
                                "no baseline recorded",
                            ),
                        );
                        continue;
                    }
                };

                match self
                    .detector
                    .detect(&baseline, current, *method, spec.adaptation_threshold)
                    .await
                {
                    Ok(drift) => {
                        result.record_metric(
                            format!("{}.{}.score", spec.metric, method),
                            drift.score,
                        );
                        if drift.drifted {
                            result.record_threshold(
                                condition,
                                ThresholdResult::fail(
                                    &spec.metric,
                                    drift.score,
                                    drift.threshold,
                                    format!(
                                        "{} drift score {:.4} above threshold {} ({})",
                                        spec.metric, drift.score, drift.threshold, method
                                    ),
                                ),
                            );
                        } else {
                            result.record_threshold(
                                condition,
                                ThresholdResult::pass(&spec.metric, drift.score, drift.threshold),
                            );
                        }
                    }
                    Err(error @ DriftError::InsufficientData { .. }) => {
                        result.record_threshold(
                            condition,
                            ThresholdResult::skipped(
                                &spec.metric,
                                spec.adaptation_threshold,
                                error.to_string(),
                            ),
                        );
                    }
                    Err(error) => {
                        return Err(EvalError::Execution {
                            name: self.name.clone(),
                            reason: error.to_string(),
                        })
                    }
                }
            }
        }

        result.finalize_status();
        Ok(result)
    }
}
