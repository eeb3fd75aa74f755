//! Service-level objective definitions.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What an SLO targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SloObjective {
    /// A success-ratio target in `(0, 1]`. The error budget is derived as
    /// `1 − target`.
    Ratio { target: f64 },

    /// An upper bound on sample values (latency-style SLOs). Ratio math
    /// does not apply, so the allowed violation fraction is supplied
    /// directly as the budget.
    UpperBound {
        bound: f64,
        allowed_violation_fraction: f64,
    },
}

impl SloObjective {
    /// The allowed fraction of SLO-violating behavior.
    pub fn error_budget(&self) -> f64 {
        match self {
            SloObjective::Ratio { target } => 1.0 - target,
            SloObjective::UpperBound {
                allowed_violation_fraction,
                ..
            } => *allowed_violation_fraction,
        }
    }
}

/// A named objective over an evaluation window.
///
/// Definitions are validated once when configuration loads and are
/// immutable afterwards; trackers and evaluators share them by reference
/// (`Arc<SloDefinition>`), never by copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SloDefinition {
    /// Name of the SLO (e.g. "inference-availability").
    pub name: String,

    /// The target and how its budget derives.
    pub objective: SloObjective,

    /// Nominal evaluation window.
    pub window: Duration,

    /// Human-readable description for reports.
    pub description: String,
}

impl SloDefinition {
    /// Create a definition; call [`validate`](Self::validate) before use.
    pub fn new(
        name: impl Into<String>,
        objective: SloObjective,
        window: Duration,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            objective,
            window,
            description: description.into(),
        }
    }

    /// Validate the definition.
    pub fn validate(&self) -> Result<(), SloValidationError> {
        if self.name.is_empty() {
            return Err(SloValidationError::EmptyName);
        }
        match &self.objective {
            SloObjective::Ratio { target } => {
                if !(*target > 0.0 && *target <= 1.0) {
                    return Err(SloValidationError::TargetOutOfRange {
                        slo: self.name.clone(),
                        target: *target,
                    });
                }
            }
            SloObjective::UpperBound {
                allowed_violation_fraction,
                ..
            } => {
                if !(0.0..=1.0).contains(allowed_violation_fraction) {
                    return Err(SloValidationError::BudgetOutOfRange {
                        slo: self.name.clone(),
                        budget: *allowed_violation_fraction,
                    });
                }
            }
        }
        if self.window.is_zero() {
            return Err(SloValidationError::ZeroWindow {
                slo: self.name.clone(),
            });
        }
        Ok(())
    }

    /// The allowed fraction of SLO-violating behavior.
    pub fn error_budget(&self) -> f64 {
        self.objective.error_budget()
    }

    /// Validate and wrap for shared use.
    pub fn into_shared(self) -> Result<Arc<Self>, SloValidationError> {
        self.validate()?;
        Ok(Arc::new(self))
    }
}

/// Validation failures for SLO definitions.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SloValidationError {
    #[error("SLO name must not be empty")]
    EmptyName,

    #[error("SLO '{slo}' target {target} outside (0, 1]")]
    TargetOutOfRange { slo: String, target: f64 },

    #[error("SLO '{slo}' allowed violation fraction {budget} outside [0, 1]")]
    BudgetOutOfRange { slo: String, budget: f64 },

    #[error("SLO '{slo}' has a zero-length window")]
    ZeroWindow { slo: String },
}
