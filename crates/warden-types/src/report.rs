//! Evaluation results and the per-run report.
//!
//! One [`EvaluationResult`] is produced per evaluator per run; the
//! orchestrator merges them, in configuration order, into an
//! [`EvaluationReport`]. Threshold entries live in `BTreeMap`s so report
//! ordering is reproducible regardless of how evaluators were scheduled.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::alert::{Alert, Severity};

/// The closed set of evaluator variants.
///
/// New variants are added by extending this set, not by open-ended
/// subclassing, so orchestrator dispatch stays exhaustive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EvaluatorKind {
    /// Error-budget tracking against configured SLOs.
    Reliability,
    /// Aggregate metrics against static thresholds.
    Performance,
    /// Threshold checks where every crossing is critical.
    Safety,
    /// Baseline-vs-current distribution drift.
    Drift,
    /// Regulatory metric checks tagged with a standard.
    Compliance,
}

impl std::fmt::Display for EvaluatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluatorKind::Reliability => write!(f, "reliability"),
            EvaluatorKind::Performance => write!(f, "performance"),
            EvaluatorKind::Safety => write!(f, "safety"),
            EvaluatorKind::Drift => write!(f, "drift"),
            EvaluatorKind::Compliance => write!(f, "compliance"),
        }
    }
}

/// Outcome of a single threshold check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdStatus {
    Pass,
    Fail,
    /// The check could not be evaluated (missing metric, not enough data).
    Skipped,
}

impl std::fmt::Display for ThresholdStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThresholdStatus::Pass => write!(f, "pass"),
            ThresholdStatus::Fail => write!(f, "fail"),
            ThresholdStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// One threshold check within an evaluation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdResult {
    /// Metric the check observed.
    pub metric: String,

    /// Outcome.
    pub status: ThresholdStatus,

    /// Observed value, absent when the check was skipped.
    pub observed: Option<f64>,

    /// Configured threshold.
    pub threshold: f64,

    /// Detail for reports and alert conditions.
    pub detail: Option<String>,
}

impl ThresholdResult {
    /// A passing check.
    pub fn pass(metric: impl Into<String>, observed: f64, threshold: f64) -> Self {
        Self {
            metric: metric.into(),
            status: ThresholdStatus::Pass,
            observed: Some(observed),
            threshold,
            detail: None,
        }
    }

    /// A failing check.
    pub fn fail(
        metric: impl Into<String>,
        observed: f64,
        threshold: f64,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            metric: metric.into(),
            status: ThresholdStatus::Fail,
            observed: Some(observed),
            threshold,
            detail: Some(detail.into()),
        }
    }

    /// A check that could not be evaluated.
    pub fn skipped(metric: impl Into<String>, threshold: f64, detail: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            status: ThresholdStatus::Skipped,
            observed: None,
            threshold,
            detail: Some(detail.into()),
        }
    }
}

/// Outcome of one evaluator invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationStatus {
    /// The evaluator ran and produced results.
    Completed,
    /// The evaluator raised or timed out; its results are not trustworthy.
    Failed,
    /// Nothing could be evaluated (no data for any configured check).
    Skipped,
}

impl std::fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluationStatus::Completed => write!(f, "completed"),
            EvaluationStatus::Failed => write!(f, "failed"),
            EvaluationStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// What one evaluator produced for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Variant that produced this result.
    pub evaluator: EvaluatorKind,

    /// Configured instance name.
    pub name: String,

    /// Scalar metrics computed during evaluation, keyed deterministically.
    pub metrics: BTreeMap<String, f64>,

    /// One entry per configured threshold, keyed by condition id.
    pub threshold_results: BTreeMap<String, ThresholdResult>,

    /// Overall outcome for this evaluator.
    pub status: EvaluationStatus,

    /// Set by safety evaluators when a critical-flagged threshold failed;
    /// downstream escalation treats the run as non-recoverable.
    pub non_recoverable: bool,

    /// Audit labels (e.g. the compliance standard).
    pub labels: BTreeMap<String, String>,

    /// Failure reason when `status` is `Failed`.
    pub error: Option<String>,

    /// When the evaluator finished.
    pub evaluated_at: DateTime<Utc>,
}

impl EvaluationResult {
    /// A fresh, completed result to be filled in by an evaluator.
    pub fn new(evaluator: EvaluatorKind, name: impl Into<String>) -> Self {
        Self {
            evaluator,
            name: name.into(),
            metrics: BTreeMap::new(),
            threshold_results: BTreeMap::new(),
            status: EvaluationStatus::Completed,
            non_recoverable: false,
            labels: BTreeMap::new(),
            error: None,
            evaluated_at: Utc::now(),
        }
    }

    /// A failed result carrying the failure reason.
    pub fn failed(
        evaluator: EvaluatorKind,
        name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        let mut result = Self::new(evaluator, name);
        result.status = EvaluationStatus::Failed;
        result.error = Some(error.into());
        result
    }

    /// Record a computed metric.
    pub fn record_metric(&mut self, key: impl Into<String>, value: f64) {
        self.metrics.insert(key.into(), value);
    }

    /// Record a threshold check outcome under its condition id.
    pub fn record_threshold(&mut self, condition: impl Into<String>, result: ThresholdResult) {
        self.threshold_results.insert(condition.into(), result);
    }

    /// Downgrade to `Skipped` when every recorded check was skipped.
    pub fn finalize_status(&mut self) {
        if !self.threshold_results.is_empty()
            && self
                .threshold_results
                .values()
                .all(|t| t.status == ThresholdStatus::Skipped)
        {
            self.status = EvaluationStatus::Skipped;
        }
    }

    /// Whether any threshold check failed.
    pub fn has_failures(&self) -> bool {
        self.threshold_results
            .values()
            .any(|t| t.status == ThresholdStatus::Fail)
    }

    /// Whether any threshold check was skipped.
    pub fn has_skips(&self) -> bool {
        self.threshold_results
            .values()
            .any(|t| t.status == ThresholdStatus::Skipped)
    }
}

/// Aggregate trustworthiness of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every evaluator completed with full data.
    Completed,
    /// At least one evaluator failed, skipped, or ran on partial data.
    PartiallyFailed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::PartiallyFailed => write!(f, "partially_failed"),
        }
    }
}

/// Everything one evaluation run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Unique run id.
    pub run_id: Uuid,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run finished.
    pub finished_at: DateTime<Utc>,

    /// Aggregate trustworthiness signal.
    pub status: RunStatus,

    /// Per-evaluator results, in evaluator configuration order.
    pub results: Vec<EvaluationResult>,

    /// Alerts derived from the results.
    pub alerts: Vec<Alert>,

    /// Required metrics the collectors could not provide.
    pub missing_metrics: Vec<String>,
}

impl EvaluationReport {
    /// Summarize the report for quick inspection.
    pub fn summary(&self) -> ReportSummary {
        let mut completed = 0usize;
        let mut failed = 0usize;
        let mut skipped = 0usize;
        for result in &self.results {
            match result.status {
                EvaluationStatus::Completed => completed += 1,
                EvaluationStatus::Failed => failed += 1,
                EvaluationStatus::Skipped => skipped += 1,
            }
        }
        ReportSummary {
            run_id: self.run_id,
            status: self.status,
            total_evaluators: self.results.len(),
            completed,
            failed,
            skipped,
            alert_count: self.alerts.len(),
            highest_severity: self.alerts.iter().map(|a| a.severity).max(),
        }
    }
}

/// Counts and the highest alert severity for one report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub total_evaluators: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub alert_count: usize,
    pub highest_severity: Option<Severity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with(results: Vec<EvaluationResult>, alerts: Vec<Alert>) -> EvaluationReport {
        EvaluationReport {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            status: RunStatus::Completed,
            results,
            alerts,
            missing_metrics: Vec::new(),
        }
    }

    #[test]
    fn test_finalize_status_all_skipped() {
        let mut result = EvaluationResult::new(EvaluatorKind::Performance, "perf");
        result.record_threshold(
            "latency_ms",
            ThresholdResult::skipped("latency_ms", 100.0, "metric not collected"),
        );
        result.finalize_status();
        assert_eq!(result.status, EvaluationStatus::Skipped);
    }

    #[test]
    fn test_finalize_status_partial_skip_stays_completed() {
        let mut result = EvaluationResult::new(EvaluatorKind::Performance, "perf");
        result.record_threshold("a", ThresholdResult::pass("a", 1.0, 2.0));
        result.record_threshold("b", ThresholdResult::skipped("b", 2.0, "no data"));
        result.finalize_status();
        assert_eq!(result.status, EvaluationStatus::Completed);
        assert!(result.has_skips());
        assert!(!result.has_failures());
    }

    #[test]
    fn test_summary_counts_and_highest_severity() {
        let ok = EvaluationResult::new(EvaluatorKind::Performance, "perf");
        let bad = EvaluationResult::failed(EvaluatorKind::Drift, "drift", "boom");
        let alerts = vec![
            Alert::new("a", Severity::Warning, "c", "m", EvaluatorKind::Drift),
            Alert::new("b", Severity::Critical, "c", "m", EvaluatorKind::Safety),
        ];
        let report = report_with(vec![ok, bad], alerts);
        let summary = report.summary();
        assert_eq!(summary.total_evaluators, 2);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.highest_severity, Some(Severity::Critical));
    }

    #[test]
    fn test_report_serializes() {
        let report = report_with(
            vec![EvaluationResult::new(EvaluatorKind::Reliability, "slo")],
            Vec::new(),
        );
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"reliability\""));
    }
}
