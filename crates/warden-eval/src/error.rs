//! Error types for evaluation orchestration.

use thiserror::Error;

/// Result alias for evaluation operations.
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors raised by evaluator construction and orchestration.
///
/// Configuration errors are fatal at setup time, before any run starts.
/// Execution and timeout errors are isolated to the evaluator that raised
/// them; the orchestrator degrades that evaluator's result and continues.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    /// Malformed thresholds, SLOs, or engine settings.
    #[error("invalid evaluator configuration: {0}")]
    Configuration(String),

    /// No factory registered for the requested evaluator type.
    #[error("unknown evaluator type '{0}'")]
    UnknownEvaluatorType(String),

    /// Unexpected failure inside one evaluator during a run.
    #[error("evaluator '{name}' failed: {reason}")]
    Execution { name: String, reason: String },

    /// One evaluator exceeded the caller-supplied time bound.
    #[error("evaluator '{name}' timed out after {timeout_ms}ms")]
    Timeout { name: String, timeout_ms: u64 },

    /// The run was cancelled between phases; no report was published.
    #[error("evaluation run cancelled")]
    Cancelled,
}
