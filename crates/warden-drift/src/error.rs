//! Error types for drift detection.

use thiserror::Error;
use warden_types::WindowError;

/// Result alias for detector operations.
pub type DetectResult<T> = Result<T, DriftError>;

/// Errors raised while detecting drift.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DriftError {
    /// One of the compared windows is below the minimum sample count.
    /// Callers surface this as a skipped check rather than trusting a
    /// score computed from too little data.
    #[error("{side} window for metric '{metric}' has {got} samples, {needed} required")]
    InsufficientData {
        metric: String,
        side: &'static str,
        needed: usize,
        got: usize,
    },

    /// Baseline and current windows cover different metrics.
    #[error("cannot compare baseline '{baseline}' against current '{current}'")]
    MetricMismatch { baseline: String, current: String },

    /// The model-based method was requested but no scorer was injected.
    #[error("drift method 'ml_model' requires an injected scorer")]
    MissingScorer,

    /// The injected scorer failed.
    #[error("drift scorer failed for metric '{metric}': {reason}")]
    Scorer { metric: String, reason: String },

    /// Underlying window operation failed.
    #[error(transparent)]
    Window(#[from] WindowError),
}
