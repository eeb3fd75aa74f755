//! Regulatory metric checks.

use async_trait::async_trait;
use tracing::instrument;

use warden_types::{EvaluationResult, EvaluatorKind};

use super::{run_threshold_checks, Evaluator};
use crate::config::ThresholdSpec;
use crate::error::EvalResult;
use crate::snapshot::MetricSnapshot;

/// Checks presence and values of regulatory metrics against
/// standard-specific thresholds. Threshold semantics match the
/// performance evaluator; results additionally carry the standard
/// identifier as a label for audit trails.
pub struct ComplianceEvaluator {
    name: String,
    standard: String,
    checks: Vec<ThresholdSpec>,
}

impl ComplianceEvaluator {
    pub fn new(
        name: impl Into<String>,
        standard: impl Into<String>,
        checks: Vec<ThresholdSpec>,
    ) -> Self {
        Self {
            name: name.into(),
            standard: standard.into(),
            checks,
        }
    }

    /// Standard this evaluator audits against.
    pub fn standard(&self) -> &str {
        &self.standard
    }
}

#[async_trait]
impl Evaluator for ComplianceEvaluator {
    fn kind(&self) -> EvaluatorKind {
        EvaluatorKind::Compliance
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn required_metrics(&self) -> Vec<String> {
        self.checks.iter().map(|c| c.metric.clone()).collect()
    }

    #[instrument(skip(self, snapshot), fields(evaluator = %self.name, standard = %self.standard))]
    async fn evaluate(&self, snapshot: &MetricSnapshot) -> EvalResult<EvaluationResult> {
        let mut result = EvaluationResult::new(self.kind(), &self.name);
        result
            .labels
            .insert("standard".to_string(), self.standard.clone());
        run_threshold_checks(&mut result, snapshot, &self.checks);
        result.finalize_status();
        Ok(result)
    }
}
