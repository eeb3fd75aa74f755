//! Warden SLO - Error budget tracking
//!
//! Turns a metric window and an SLO definition into an
//! [`ErrorBudgetState`]: how much of the error budget the observed
//! violations consumed, how fast it is burning relative to the nominal
//! window, and whether the SLO is ok, at risk, or exhausted.
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use chrono::{TimeZone, Utc};
//! use warden_slo::{BudgetConfig, BudgetTracker};
//! use warden_types::{MetricWindow, SloDefinition, SloObjective};
//!
//! let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
//! let end = start + chrono::Duration::minutes(60);
//! // success indicators: 9 good, 1 bad
//! let window = MetricWindow::from_observations(
//!     "availability",
//!     start,
//!     end,
//!     (0..10).map(|i| (start + chrono::Duration::seconds(i), if i < 9 { 1.0 } else { 0.0 })),
//! )
//! .unwrap();
//!
//! let slo = SloDefinition::new(
//!     "availability",
//!     SloObjective::Ratio { target: 0.95 },
//!     Duration::from_secs(3_600),
//!     "fraction of successful inferences",
//! );
//!
//! let tracker = BudgetTracker::new(BudgetConfig::default());
//! let state = tracker.compute(&window, &slo).unwrap();
//! assert!(state.consumed_fraction > 1.0);
//! ```

#![deny(unsafe_code)]

pub mod error;
pub mod tracker;

pub use error::{BudgetError, BudgetResult};
pub use tracker::{BudgetConfig, BudgetStatus, BudgetTracker, ErrorBudgetState};
