//! Static threshold checks over aggregate metrics.

use async_trait::async_trait;
use tracing::instrument;

use warden_types::{EvaluationResult, EvaluatorKind};

use super::{run_threshold_checks, Evaluator};
use crate::config::ThresholdSpec;
use crate::error::EvalResult;
use crate::snapshot::MetricSnapshot;

/// Compares aggregate metric values (latency percentiles, throughput,
/// accuracy) against static thresholds. Purely functional, no
/// error-budget semantics.
pub struct PerformanceEvaluator {
    name: String,
    checks: Vec<ThresholdSpec>,
}

impl PerformanceEvaluator {
    pub fn new(name: impl Into<String>, checks: Vec<ThresholdSpec>) -> Self {
        Self {
            name: name.into(),
            checks,
        }
    }
}

#[async_trait]
impl Evaluator for PerformanceEvaluator {
    fn kind(&self) -> EvaluatorKind {
        EvaluatorKind::Performance
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn required_metrics(&self) -> Vec<String> {
        self.checks.iter().map(|c| c.metric.clone()).collect()
    }

    #[instrument(skip(self, snapshot), fields(evaluator = %self.name))]
    async fn evaluate(&self, snapshot: &MetricSnapshot) -> EvalResult<EvaluationResult> {
        let mut result = EvaluationResult::new(self.kind(), &self.name);
        run_threshold_checks(&mut result, snapshot, &self.checks);
        result.finalize_status();
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ComparisonOp;
    use crate::evaluators::testutil::snapshot_with;
    use warden_types::{Aggregation, EvaluationStatus, ThresholdStatus};

    fn p99_check(threshold: f64) -> ThresholdSpec {
        ThresholdSpec::new(
            "latency_ms",
            Aggregation::Percentile(0.99),
            ComparisonOp::GreaterThan,
            threshold,
        )
    }

    #[tokio::test]
    async fn test_passing_and_failing_checks() {
        let evaluator = PerformanceEvaluator::new(
            "perf",
            vec![
                p99_check(500.0),
                ThresholdSpec::new(
                    "throughput",
                    Aggregation::Mean,
                    ComparisonOp::LessThan,
                    100.0,
                ),
            ],
        );
        let snapshot = snapshot_with(&[
            ("latency_ms", &[100.0, 120.0, 90.0, 400.0]),
            ("throughput", &[50.0, 60.0]),
        ]);

        let result = evaluator.evaluate(&snapshot).await.unwrap();
        assert_eq!(result.status, EvaluationStatus::Completed);
        assert_eq!(result.threshold_results.len(), 2);

        let latency = &result.threshold_results[&p99_check(500.0).condition()];
        assert_eq!(latency.status, ThresholdStatus::Pass);

        // mean throughput 55 < 100 violates the floor
        let throughput = result
            .threshold_results
            .values()
            .find(|t| t.metric == "throughput")
            .unwrap();
        assert_eq!(throughput.status, ThresholdStatus::Fail);
        assert!(result.has_failures());

        assert!(result.metrics.contains_key("latency_ms.p99"));
        assert!(result.metrics.contains_key("throughput.mean"));
    }

    #[tokio::test]
    async fn test_missing_metric_degrades_to_skipped() {
        let evaluator = PerformanceEvaluator::new("perf", vec![p99_check(500.0)]);
        let snapshot = snapshot_with(&[]);

        let result = evaluator.evaluate(&snapshot).await.unwrap();
        assert_eq!(result.status, EvaluationStatus::Skipped);
        let check = result.threshold_results.values().next().unwrap();
        assert_eq!(check.status, ThresholdStatus::Skipped);
        assert_eq!(check.observed, None);
    }

    #[tokio::test]
    async fn test_empty_window_is_no_data_not_zero() {
        let evaluator = PerformanceEvaluator::new("perf", vec![p99_check(500.0)]);
        let snapshot = snapshot_with(&[("latency_ms", &[])]);

        let result = evaluator.evaluate(&snapshot).await.unwrap();
        assert_eq!(result.status, EvaluationStatus::Skipped);
    }

    #[tokio::test]
    async fn test_evaluate_is_idempotent() {
        let evaluator = PerformanceEvaluator::new("perf", vec![p99_check(50.0)]);
        let snapshot = snapshot_with(&[("latency_ms", &[100.0, 120.0])]);

        let a = evaluator.evaluate(&snapshot).await.unwrap();
        let b = evaluator.evaluate(&snapshot).await.unwrap();
        assert_eq!(a.status, b.status);
        assert_eq!(a.metrics, b.metrics);
        assert_eq!(
            a.threshold_results.keys().collect::<Vec<_>>(),
            b.threshold_results.keys().collect::<Vec<_>>()
        );
    }
}
