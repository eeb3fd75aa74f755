//! Evaluator variants.
//!
//! Evaluators are the polymorphic unit of the engine: each consumes the
//! shared metric snapshot plus its own configuration and produces one
//! [`EvaluationResult`]. The set of variants is closed over
//! [`EvaluatorKind`]; deployments extend the engine through the registry,
//! not by subclassing.
//!
//! Every variant degrades gracefully: a required metric absent from the
//! snapshot turns into a skipped check, never a run-fatal error.

mod compliance;
mod drift;
mod performance;
mod reliability;
mod safety;

pub use compliance::ComplianceEvaluator;
pub use drift::DriftEvaluator;
pub use performance::PerformanceEvaluator;
pub use reliability::ReliabilityEvaluator;
pub use safety::SafetyEvaluator;

use async_trait::async_trait;

use warden_types::{EvaluationResult, EvaluatorKind, ThresholdResult};

use crate::config::ThresholdSpec;
use crate::error::EvalResult;
use crate::snapshot::MetricSnapshot;

/// Common capability of all evaluator variants.
///
/// Implementations hold no references to snapshot windows beyond their
/// own `evaluate` call; the only sanctioned cross-run state is the drift
/// evaluator's explicitly refreshed baseline store.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Which variant this is.
    fn kind(&self) -> EvaluatorKind;

    /// Configured instance name.
    fn name(&self) -> &str;

    /// Metrics this evaluator needs in the snapshot.
    fn required_metrics(&self) -> Vec<String>;

    /// Evaluate against a shared snapshot.
    async fn evaluate(&self, snapshot: &MetricSnapshot) -> EvalResult<EvaluationResult>;
}

/// Run static threshold checks into `result`.
///
/// Shared by the performance, safety, and compliance variants. Returns
/// whether any critical-flagged check failed.
pub(crate) fn run_threshold_checks(
    result: &mut EvaluationResult,
    snapshot: &MetricSnapshot,
    checks: &[ThresholdSpec],
) -> bool {
    let mut critical_failure = false;
    for check in checks {
        let condition = check.condition();
        let Some(window) = snapshot.window(&check.metric) else {
            result.record_threshold(
                condition,
                ThresholdResult::skipped(&check.metric, check.threshold, "metric not collected"),
            );
            continue;
        };
        let observed = match window.aggregate(check.aggregation) {
            Ok(value) => value,
            Err(error) => {
                result.record_threshold(
                    condition,
                    ThresholdResult::skipped(&check.metric, check.threshold, error.to_string()),
                );
                continue;
            }
        };
        result.record_metric(format!("{}.{}", check.metric, check.aggregation), observed);

        if check.op.violated(observed, check.threshold) {
            critical_failure |= check.critical;
            result.record_threshold(
                condition,
                ThresholdResult::fail(
                    &check.metric,
                    observed,
                    check.threshold,
                    format!(
                        "{} {} observed {} {} {}",
                        check.metric, check.aggregation, observed, check.op, check.threshold
                    ),
                ),
            );
        } else {
            result.record_threshold(
                condition,
                ThresholdResult::pass(&check.metric, observed, check.threshold),
            );
        }
    }
    critical_failure
}
