//! Error types for budget tracking.

use thiserror::Error;
use warden_types::WindowError;

/// Result alias for budget operations.
pub type BudgetResult<T> = Result<T, BudgetError>;

/// Errors raised while computing error-budget state.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BudgetError {
    /// Not enough samples to evaluate the SLO. Callers surface this as a
    /// skipped check, never as a passing one.
    #[error("metric '{metric}' has {got} samples, {needed} required to evaluate SLO '{slo}'")]
    InsufficientData {
        slo: String,
        metric: String,
        needed: usize,
        got: usize,
    },

    /// Underlying window operation failed.
    #[error(transparent)]
    Window(#[from] WindowError),
}
