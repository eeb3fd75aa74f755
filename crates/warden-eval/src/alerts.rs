//! Alert derivation from evaluation results.
//!
//! Rules are evaluated in configured order and the first rule matching a
//! threshold failure decides its severity, so one failure never counts
//! into two severities. Within a run at most one alert is emitted per
//! `(evaluator kind, metric, severity)` tuple; the deduplication set is
//! scoped to the run and discarded with it.

use std::collections::HashSet;

use tracing::debug;

use warden_types::{Alert, EvaluationResult, EvaluatorKind, Severity, ThresholdStatus};

use crate::config::AlertingConfig;

/// What a rule matches against a threshold failure.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertCondition {
    /// Any failure inside a result marked non-recoverable.
    NonRecoverable,
    /// Any failure produced by an evaluator of this kind.
    KindFailure(EvaluatorKind),
    /// A reliability failure whose error budget is fully consumed.
    BudgetExhausted,
    /// A reliability failure burning faster than the given multiple of
    /// the nominal window.
    BurnRateAbove(f64),
}

/// One ordered severity rule.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRule {
    /// Rule name, carried into the alerts it produces.
    pub name: String,

    /// Severity assigned on match.
    pub severity: Severity,

    /// Matching condition.
    pub condition: AlertCondition,
}

impl AlertRule {
    pub fn new(
        name: impl Into<String>,
        severity: Severity,
        condition: AlertCondition,
    ) -> Self {
        Self {
            name: name.into(),
            severity,
            condition,
        }
    }

    /// The default severity ladder, from most to least urgent.
    pub fn default_rules(alerting: &AlertingConfig) -> Vec<AlertRule> {
        vec![
            AlertRule::new(
                "safety-non-recoverable",
                Severity::Emergency,
                AlertCondition::NonRecoverable,
            ),
            AlertRule::new(
                "safety-threshold",
                Severity::Critical,
                AlertCondition::KindFailure(EvaluatorKind::Safety),
            ),
            AlertRule::new(
                "error-budget-exhausted",
                Severity::Critical,
                AlertCondition::BudgetExhausted,
            ),
            AlertRule::new(
                "error-budget-burn-rate",
                Severity::Warning,
                AlertCondition::BurnRateAbove(alerting.burn_rate_warning),
            ),
            AlertRule::new(
                "drift-detected",
                Severity::Warning,
                AlertCondition::KindFailure(EvaluatorKind::Drift),
            ),
            AlertRule::new(
                "reliability-degraded",
                Severity::Info,
                AlertCondition::KindFailure(EvaluatorKind::Reliability),
            ),
            AlertRule::new(
                "performance-threshold",
                Severity::Info,
                AlertCondition::KindFailure(EvaluatorKind::Performance),
            ),
            AlertRule::new(
                "compliance-threshold",
                Severity::Info,
                AlertCondition::KindFailure(EvaluatorKind::Compliance),
            ),
        ]
    }

    fn matches(&self, result: &EvaluationResult, condition_id: &str) -> bool {
        match &self.condition {
            AlertCondition::NonRecoverable => result.non_recoverable,
            AlertCondition::KindFailure(kind) => result.evaluator == *kind,
            AlertCondition::BudgetExhausted => {
                result.evaluator == EvaluatorKind::Reliability
                    && result
                        .metrics
                        .get(&format!("{condition_id}.consumed_fraction"))
                        .is_some_and(|consumed| *consumed >= 1.0)
            }
            AlertCondition::BurnRateAbove(multiple) => {
                result.evaluator == EvaluatorKind::Reliability
                    && result
                        .metrics
                        .get(&format!("{condition_id}.burn_rate"))
                        .is_some_and(|burn| *burn > *multiple)
            }
        }
    }
}

/// Derives severity-classified alerts from a run's results.
pub struct AlertEngine {
    rules: Vec<AlertRule>,
}

impl AlertEngine {
    pub fn new(rules: Vec<AlertRule>) -> Self {
        Self { rules }
    }

    /// Configured rules, in evaluation order.
    pub fn rules(&self) -> &[AlertRule] {
        &self.rules
    }

    /// Derive alerts for one run's results, in result order.
    pub fn derive(&self, results: &[EvaluationResult]) -> Vec<Alert> {
        let mut seen: HashSet<(EvaluatorKind, String, Severity)> = HashSet::new();
        let mut alerts = Vec::new();

        for result in results {
            for (condition_id, check) in &result.threshold_results {
                if check.status != ThresholdStatus::Fail {
                    continue;
                }
                let Some(rule) = self
                    .rules
                    .iter()
                    .find(|rule| rule.matches(result, condition_id))
                else {
                    continue;
                };
                if !seen.insert((result.evaluator, check.metric.clone(), rule.severity)) {
                    debug!(
                        evaluator = %result.evaluator,
                        metric = %check.metric,
                        severity = %rule.severity,
                        "Deduplicated alert"
                    );
                    continue;
                }
                let condition = check
                    .detail
                    .clone()
                    .unwrap_or_else(|| condition_id.clone());
                alerts.push(Alert::new(
                    &rule.name,
                    rule.severity,
                    condition,
                    &check.metric,
                    result.evaluator,
                ));
            }
        }
        alerts
    }
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new(AlertRule::default_rules(&AlertingConfig::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_types::ThresholdResult;

    fn failing_result(kind: EvaluatorKind, conditions: &[(&str, &str)]) -> EvaluationResult {
        let mut result = EvaluationResult::new(kind, kind.to_string());
        for (condition, metric) in conditions {
            result.record_threshold(
                *condition,
                ThresholdResult::fail(*metric, 1.0, 0.5, format!("{metric} over threshold")),
            );
        }
        result
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let mut result = failing_result(EvaluatorKind::Safety, &[("toxicity", "toxicity_rate")]);
        result.non_recoverable = true;

        let alerts = AlertEngine::default().derive(&[result]);
        // emergency rule matches first; the critical safety rule never fires
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Emergency);
        assert_eq!(alerts[0].name, "safety-non-recoverable");
    }

    #[test]
    fn test_recoverable_safety_failure_is_critical() {
        let result = failing_result(EvaluatorKind::Safety, &[("toxicity", "toxicity_rate")]);
        let alerts = AlertEngine::default().derive(&[result]);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Critical);
    }

    #[test]
    fn test_same_tuple_deduplicates() {
        // two threshold failures on the same metric from one evaluator,
        // both resolving to (performance, latency_ms, info)
        let result = failing_result(
            EvaluatorKind::Performance,
            &[
                ("latency_ms p99 > 250", "latency_ms"),
                ("latency_ms mean > 100", "latency_ms"),
            ],
        );
        let alerts = AlertEngine::default().derive(&[result]);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].metric, "latency_ms");
        assert_eq!(alerts[0].severity, Severity::Info);
    }

    #[test]
    fn test_distinct_metrics_both_alert() {
        let result = failing_result(
            EvaluatorKind::Performance,
            &[
                ("latency_ms p99 > 250", "latency_ms"),
                ("throughput mean < 100", "throughput"),
            ],
        );
        let alerts = AlertEngine::default().derive(&[result]);
        assert_eq!(alerts.len(), 2);
    }

    #[test]
    fn test_exhausted_budget_is_critical() {
        let mut result =
            failing_result(EvaluatorKind::Reliability, &[("availability", "success_rate")]);
        result.record_metric("availability.consumed_fraction", 2.0);
        result.record_metric("availability.burn_rate", 4.0);

        let alerts = AlertEngine::default().derive(&[result]);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(alerts[0].name, "error-budget-exhausted");
    }

    #[test]
    fn test_fast_burn_is_warning() {
        let mut result =
            failing_result(EvaluatorKind::Reliability, &[("availability", "success_rate")]);
        result.record_metric("availability.consumed_fraction", 0.4);
        result.record_metric("availability.burn_rate", 3.0);

        let alerts = AlertEngine::default().derive(&[result]);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Warning);
        assert_eq!(alerts[0].name, "error-budget-burn-rate");
    }

    #[test]
    fn test_slow_burn_at_risk_is_info() {
        let mut result =
            failing_result(EvaluatorKind::Reliability, &[("availability", "success_rate")]);
        result.record_metric("availability.consumed_fraction", 0.4);
        result.record_metric("availability.burn_rate", 1.5);

        let alerts = AlertEngine::default().derive(&[result]);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Info);
        assert_eq!(alerts[0].name, "reliability-degraded");
    }

    #[test]
    fn test_passing_results_produce_no_alerts() {
        let mut result = EvaluationResult::new(EvaluatorKind::Performance, "perf");
        result.record_threshold(
            "latency_ms p99 > 250",
            ThresholdResult::pass("latency_ms", 100.0, 250.0),
        );
        let alerts = AlertEngine::default().derive(&[result]);
        assert!(alerts.is_empty());
    }
}
