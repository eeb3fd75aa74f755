//! Warden Drift - Distribution drift detection
//!
//! Compares a current metric window against a baseline window and flags
//! statistically significant change. Two method families:
//!
//! - **Statistical**: a distribution distance computed in-process, either
//!   the population stability index (default) or the two-sample
//!   Kolmogorov-Smirnov distance.
//! - **MlModel**: the score is delegated to an injected [`DriftScorer`];
//!   the detector only applies the threshold and wraps the result.
//!
//! Detection is stateless per call. Baseline ownership and refresh policy
//! belong to the caller; the drift evaluator in `warden-eval` keeps a
//! baseline store and refreshes it explicitly.
//!
//! ## Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use warden_drift::{DriftConfig, DriftDetector, DriftMethod};
//! use warden_types::MetricWindow;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
//! let end = start + chrono::Duration::hours(1);
//! let observe = |offset: f64| {
//!     MetricWindow::from_observations(
//!         "prediction_confidence",
//!         start,
//!         end,
//!         (0..100).map(|i| (start + chrono::Duration::seconds(i), (i % 10) as f64 + offset)),
//!     )
//!     .unwrap()
//! };
//!
//! let detector = DriftDetector::new(DriftConfig::default());
//! let result = detector
//!     .detect(&observe(0.0), &observe(8.0), DriftMethod::Statistical, 0.2)
//!     .await
//!     .unwrap();
//! assert!(result.drifted);
//! # }
//! ```

#![deny(unsafe_code)]

pub mod detector;
pub mod error;

pub use detector::{
    DriftConfig, DriftDetector, DriftMethod, DriftResult, DriftScorer, DriftStatistic, ScorerFn,
};
pub use error::{DetectResult, DriftError};
