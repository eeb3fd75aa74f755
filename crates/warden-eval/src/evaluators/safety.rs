//! Safety threshold checks.

use async_trait::async_trait;
use tracing::{instrument, warn};

use warden_types::{EvaluationResult, EvaluatorKind};

use super::{run_threshold_checks, Evaluator};
use crate::config::ThresholdSpec;
use crate::error::EvalResult;
use crate::snapshot::MetricSnapshot;

/// Threshold checks where every crossing is an incident, regardless of
/// magnitude. A failing check flagged `critical` marks the whole result
/// non-recoverable so downstream escalation treats it accordingly.
pub struct SafetyEvaluator {
    name: String,
    checks: Vec<ThresholdSpec>,
}

impl SafetyEvaluator {
    pub fn new(name: impl Into<String>, checks: Vec<ThresholdSpec>) -> Self {
        Self {
            name: name.into(),
            checks,
        }
    }
}

#[async_trait]
impl Evaluator for SafetyEvaluator {
    fn kind(&self) -> EvaluatorKind {
        EvaluatorKind::Safety
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
        let critical_failure = run_threshold_checks(&mut result, snapshot, &self.checks);
        if critical_failure {
            result.non_recoverable = true;
            warn!(
                evaluator = %self.name,
                "Critical safety threshold failed; marking result non-recoverable"
            );
        }
        result.finalize_status();
        Ok(result)
    }
}
