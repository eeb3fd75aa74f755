//! Error types for the shared data model.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by metric window operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WindowError {
    /// Sample timestamp lies outside the declared window bounds.
    #[error("sample at {timestamp} outside window [{start}, {end}) for metric '{metric}'")]
    OutOfWindow {
        metric: String,
        timestamp: DateTime<Utc>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Sample belongs to a different metric than the window.
    #[error("sample for metric '{sample_metric}' pushed into window for '{window_metric}'")]
    MetricMismatch {
        window_metric: String,
        sample_metric: String,
    },

    /// Sample timestamp is older than the newest sample already recorded.
    #[error("sample at {timestamp} for metric '{metric}' is older than the newest recorded sample")]
    OutOfOrder {
        metric: String,
        timestamp: DateTime<Utc>,
    },

    /// Aggregation requested over a window with no samples.
    #[error("window for metric '{metric}' contains no samples")]
    Empty { metric: String },
}
