//! Error-budget checks against configured SLOs.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use warden_slo::{BudgetError, BudgetStatus, BudgetTracker};
use warden_types::{EvaluationResult, EvaluatorKind, SloDefinition, ThresholdResult};

use super::Evaluator;
use crate::error::EvalResult;
use crate::snapshot::MetricSnapshot;

/// A consumed fraction of 1.0 is the budget fully spent; budget checks
/// report against that line.
const BUDGET_LIMIT: f64 = 1.0;

/// Invokes the error-budget tracker for each configured SLO and folds
/// the per-SLO states into one result.
///
/// Recorded metrics per SLO: `<slo>.consumed_fraction`, `<slo>.burn_rate`
/// and `<slo>.remaining_fraction`. The threshold entry for an SLO fails
/// whenever its budget status is not `Ok`.
pub struct ReliabilityEvaluator {
    name: String,
    /// `(metric, definition)` pairs; the metric names the window the SLO
    /// is evaluated against.
    slos: Vec<(String, Arc<SloDefinition>)>,
    tracker: BudgetTracker,
}

impl ReliabilityEvaluator {
    pub fn new(
        name: impl Into<String>,
        slos: Vec<(String, Arc<SloDefinition>)>,
        tracker: BudgetTracker,
    ) -> Self {
        Self {
            name: name.into(),
            slos,
            tracker,
        }
    }
}

#[async_trait]
impl Evaluator for ReliabilityEvaluator {
    fn kind(&self) -> EvaluatorKind {
        EvaluatorKind::Reliability
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn required_metrics(&self) -> Vec<String> {
        self.slos.iter().map(|(metric, _)| metric.clone()).collect()
    }

    #[instrument(skip(self, snapshot), fields(evaluator = %self.name))]
    async fn evaluate(&self, snapshot: &MetricSnapshot) -> EvalResult<EvaluationResult> {
        let mut result = EvaluationResult::new(self.kind(), &self.name);

        for (metric, slo) in &self.slos {
            let condition = slo.name.clone();
            let Some(window) = snapshot.window(metric) else {
                result.record_threshold(
                    condition,
                    ThresholdResult::skipped(metric, BUDGET_LIMIT, "metric not collected"),
                );
                continue;
            };

            match self.tracker.compute(window, slo) {
                Ok(state) => {
                    result.record_metric(
                        format!("{}.consumed_fraction", slo.name),
                        state.consumed_fraction,
                    );
                    result.record_metric(format!("{}.burn_rate", slo.name), state.burn_rate);
                    result.record_metric(
                        format!("{}.remaining_fraction", slo.name),
                        state.remaining_fraction,
                    );

                    if state.status == BudgetStatus::Ok {
                        result.record_threshold(
                            condition,
                            ThresholdResult::pass(metric, state.consumed_fraction, BUDGET_LIMIT),
                        );
                    } else {
                        result.record_threshold(
                            condition,
                            ThresholdResult::fail(
                                metric,
                                state.consumed_fraction,
                                BUDGET_LIMIT,
                                format!(
                                    "SLO '{}' budget {}: consumed {:.3} of budget, burn rate {:.2}",
                                    slo.name, state.status, state.consumed_fraction, state.burn_rate
                                ),
                            ),
                        );
                    }
                }
                Err(error @ BudgetError::InsufficientData { .. }) => {
                    result.record_threshold(
                        condition,
                        ThresholdResult::skipped(metric, BUDGET_LIMIT, error.to_string()),
                    );
                }
                Err(BudgetError::Window(error)) => {
                    result.record_threshold(
                        condition,
                        ThresholdResult::skipped(metric, BUDGET_LIMIT, error.to_string()),
                    );
                }
            }
        }

        result.finalize_status();
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluators::testutil::snapshot_with;
    use std::time::Duration;
    use warden_slo::BudgetConfig;
    use warden_types::{EvaluationStatus, SloObjective, ThresholdStatus};

    fn availability_slo(target: f64) -> Arc<SloDefinition> {
        Arc::new(SloDefinition::new(
            "availability",
            SloObjective::Ratio { target },
            Duration::from_secs(3_600),
            "fraction of successful inferences",
        ))
    }

    /// `good` successes then `bad` failures as 0/1 indicators.
    fn indicators(good: usize, bad: usize) -> Vec<f64> {
        (0..good + bad)
            .map(|i| if i < good { 1.0 } else { 0.0 })
            .collect()
    }

    #[tokio::test]
    async fn test_exhausted_budget_fails_check() {
        let evaluator = ReliabilityEvaluator::new(
            "slo",
            vec![("success_indicator".to_string(), availability_slo(0.95))],
            BudgetTracker::default(),
        );
        // 10% violations against a 5% budget
        let values = indicators(90, 10);
        let snapshot = snapshot_with(&[("success_indicator", &values)]);

        let result = evaluator.evaluate(&snapshot).await.unwrap();
        assert_eq!(result.status, EvaluationStatus::Completed);

        let check = &result.threshold_results["availability"];
        assert_eq!(check.status, ThresholdStatus::Fail);
        assert!((check.observed.unwrap() - 2.0).abs() < 1e-9);
        assert!((result.metrics["availability.consumed_fraction"] - 2.0).abs() < 1e-9);
        assert_eq!(result.metrics["availability.remaining_fraction"], 0.0);
    }

    #[tokio::test]
    async fn test_healthy_budget_passes() {
        let evaluator = ReliabilityEvaluator::new(
            "slo",
            vec![("success_indicator".to_string(), availability_slo(0.95))],
            BudgetTracker::default(),
        );
        let values = indicators(99, 1);
        let snapshot = snapshot_with(&[("success_indicator", &values)]);

        let result = evaluator.evaluate(&snapshot).await.unwrap();
        let check = &result.threshold_results["availability"];
        assert_eq!(check.status, ThresholdStatus::Pass);
        assert!(!result.has_failures());
    }

    #[tokio::test]
    async fn test_missing_metric_skips_that_slo() {
        let evaluator = ReliabilityEvaluator::new(
            "slo",
            vec![
                ("success_indicator".to_string(), availability_slo(0.95)),
                (
                    "not_collected".to_string(),
                    Arc::new(SloDefinition::new(
                        "freshness",
                        SloObjective::Ratio { target: 0.99 },
                        Duration::from_secs(3_600),
                        "",
                    )),
                ),
            ],
            BudgetTracker::default(),
        );
        let values = indicators(99, 1);
        let snapshot = snapshot_with(&[("success_indicator", &values)]);

        let result = evaluator.evaluate(&snapshot).await.unwrap();
        // one SLO evaluated, one skipped; the result as a whole stands
        assert_eq!(result.status, EvaluationStatus::Completed);
        assert_eq!(
            result.threshold_results["freshness"].status,
            ThresholdStatus::Skipped
        );
        assert_eq!(
            result.threshold_results["availability"].status,
            ThresholdStatus::Pass
        );
    }

    #[tokio::test]
    async fn test_insufficient_data_is_skipped_not_ok() {
        let evaluator = ReliabilityEvaluator::new(
            "slo",
            vec![("success_indicator".to_string(), availability_slo(0.95))],
            BudgetTracker::new(BudgetConfig { min_samples: 100 }),
        );
        let values = indicators(10, 0);
        let snapshot = snapshot_with(&[("success_indicator", &values)]);

        let result = evaluator.evaluate(&snapshot).await.unwrap();
        assert_eq!(result.status, EvaluationStatus::Skipped);
        let check = &result.threshold_results["availability"];
        assert_eq!(check.status, ThresholdStatus::Skipped);
        assert!(check.detail.as_deref().unwrap().contains("samples"));
    }

    #[tokio::test]
    async fn test_zero_tolerance_violation_exhausts() {
        let evaluator = ReliabilityEvaluator::new(
            "slo",
            vec![("success_indicator".to_string(), availability_slo(1.0))],
            BudgetTracker::default(),
        );
        let values = indicators(999, 1);
        let snapshot = snapshot_with(&[("success_indicator", &values)]);

        let result = evaluator.evaluate(&snapshot).await.unwrap();
        let check = &result.threshold_results["availability"];
        assert_eq!(check.status, ThresholdStatus::Fail);
        assert!(result.metrics["availability.consumed_fraction"].is_infinite());
    }
}
