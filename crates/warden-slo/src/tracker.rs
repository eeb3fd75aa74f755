//! Error-budget computation.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use warden_types::{MetricWindow, SloDefinition};

use crate::error::{BudgetError, BudgetResult};

/// Configuration for budget tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Minimum sample count below which computation fails with
    /// `InsufficientData` instead of producing a spurious state.
    pub min_samples: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self { min_samples: 1 }
    }
}

/// Where an SLO stands within its error budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    /// Consumption and burn rate are within budget.
    Ok,
    /// Budget not yet exhausted, but burning faster than the window allows.
    AtRisk,
    /// Budget fully consumed.
    Exhausted,
}

impl std::fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BudgetStatus::Ok => write!(f, "ok"),
            BudgetStatus::AtRisk => write!(f, "at_risk"),
            BudgetStatus::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Error-budget state for one SLO over one evaluation run.
///
/// Fresh per run; cross-run history is an append-only log owned by the
/// caller, not by the tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBudgetState {
    /// SLO this state was computed for.
    pub slo_name: String,

    /// Observed window bounds.
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,

    /// Fraction of samples violating the objective.
    pub observed_violation_rate: f64,

    /// Violation rate divided by the error budget. May be `+∞` for
    /// zero-tolerance SLOs with any violation.
    pub consumed_fraction: f64,

    /// Consumption velocity normalized against the nominal window; 1.0
    /// means "on track to exhaust the budget exactly at window end".
    pub burn_rate: f64,

    /// `max(0, 1 − consumed_fraction)`.
    pub remaining_fraction: f64,

    /// Projected time until exhaustion at the current burn rate, when the
    /// budget is burning faster than the window allows.
    pub time_to_exhaustion: Option<Duration>,

    /// Derived status.
    pub status: BudgetStatus,
}

/// Computes error-budget state from a window and an SLO definition.
#[derive(Debug, Clone, Default)]
pub struct BudgetTracker {
    config: BudgetConfig,
}

impl BudgetTracker {
    /// Create a tracker.
    pub fn new(config: BudgetConfig) -> Self {
        Self { config }
    }

    /// Compute budget state for one SLO over one window.
    ///
    /// Zero-tolerance SLOs (`target = 1.0`) have a zero budget: any
    /// violation yields an infinite consumed fraction and immediate
    /// exhaustion rather than a division failure.
    pub fn compute(
        &self,
        window: &MetricWindow,
        slo: &SloDefinition,
    ) -> BudgetResult<ErrorBudgetState> {
        if window.len() < self.config.min_samples {
            return Err(BudgetError::InsufficientData {
                slo: slo.name.clone(),
                metric: window.metric().to_string(),
                needed: self.config.min_samples,
                got: window.len(),
            });
        }

        let observed_violation_rate = window.violation_rate(&slo.objective)?;
        let error_budget = slo.error_budget();

        let consumed_fraction = if error_budget <= 0.0 {
            if observed_violation_rate > 0.0 {
                f64::INFINITY
            } else {
                0.0
            }
        } else {
            (observed_violation_rate / error_budget).max(0.0)
        };

        let elapsed_secs = window.span().num_milliseconds() as f64 / 1_000.0;
        let nominal_secs = slo.window.as_secs_f64();
        let burn_rate = if elapsed_secs > 0.0 && nominal_secs > 0.0 {
            consumed_fraction / (elapsed_secs / nominal_secs)
        } else if consumed_fraction > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let remaining_fraction = (1.0 - consumed_fraction).max(0.0);

        let status = if consumed_fraction >= 1.0 {
            BudgetStatus::Exhausted
        } else if burn_rate > 1.0 {
            BudgetStatus::AtRisk
        } else {
            BudgetStatus::Ok
        };

        let time_to_exhaustion = if status == BudgetStatus::AtRisk && burn_rate.is_finite() {
            Some(Duration::from_secs_f64(
                remaining_fraction * nominal_secs / burn_rate,
            ))
        } else {
            None
        };

        debug!(
            slo = %slo.name,
            violation_rate = observed_violation_rate,
            consumed = consumed_fraction,
            burn_rate,
            status = %status,
            "Computed error budget state"
        );

        Ok(ErrorBudgetState {
            slo_name: slo.name.clone(),
            window_start: window.start(),
            window_end: window.end(),
            observed_violation_rate,
            consumed_fraction,
            burn_rate,
            remaining_fraction,
            time_to_exhaustion,
            status,
        })
    }
}
