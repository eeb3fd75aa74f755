//! Alerts and their severity ladder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::report::EvaluatorKind;

/// Alert severity, ordered from least to most urgent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational, no action needed.
    Info,
    /// Investigation recommended.
    #[default]
    Warning,
    /// Action required.
    Critical,
    /// Immediate action required; downstream escalation is expected.
    Emergency,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
            Severity::Emergency => write!(f, "emergency"),
        }
    }
}

/// A severity-classified condition derived from one evaluation run.
///
/// Alerts have no lifecycle beyond the run that created them; escalation
/// tracking across runs belongs to the incident-response side of the
/// house, not to the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Unique alert id.
    pub id: Uuid,

    /// Name of the rule that produced this alert.
    pub name: String,

    /// Severity assigned by the matching rule.
    pub severity: Severity,

    /// Human-readable description of the triggering condition.
    pub condition: String,

    /// Metric whose threshold failure triggered the alert.
    pub metric: String,

    /// Evaluator that produced the failure.
    pub evaluator: EvaluatorKind,

    /// When the alert was raised.
    pub triggered_at: DateTime<Utc>,
}

impl Alert {
    /// Create a new alert stamped with the current time.
    pub fn new(
        name: impl Into<String>,
        severity: Severity,
        condition: impl Into<String>,
        metric: impl Into<String>,
        evaluator: EvaluatorKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            severity,
            condition: condition.into(),
            metric: metric.into(),
            evaluator,
            triggered_at: Utc::now(),
        }
    }
}
