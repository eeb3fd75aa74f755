//! Warden Eval - Evaluator orchestration and alert derivation
//!
//! The engine half of Warden: a configurable set of evaluators runs over
//! a shared snapshot of metric windows, and the orchestrator folds their
//! results into one auditable [`EvaluationReport`](warden_types::EvaluationReport)
//! with severity-classified alerts.
//!
//! ## Evaluator variants
//!
//! - **Reliability**: error-budget tracking per configured SLO
//! - **Performance**: aggregate metrics against static thresholds
//! - **Safety**: threshold checks where every crossing is an incident and
//!   critical-flagged failures are non-recoverable
//! - **Drift**: baseline-vs-current distribution comparison
//! - **Compliance**: regulatory checks tagged with a standard
//!
//! The variant set is closed; deployments extend the engine by
//! registering factories in the [`EvaluatorRegistry`], keyed by the
//! `kind` string from configuration.
//!
//! ## Failure domains
//!
//! Configuration errors fail orchestrator construction, before any run.
//! During a run, each evaluator is its own failure domain: a raise or a
//! timeout degrades that evaluator's result to failed while its siblings
//! finish, and the run closes `PartiallyFailed`. A missing metric
//! degrades the affected checks to skipped. A run always produces a
//! report unless it was cancelled between phases.
//!
//! ## Example
//!
//! ```rust,no_run
//! use warden_eval::{
//!     EngineConfig, EvaluatorRegistry, EvaluatorSpec, MetricSource, Orchestrator, SloSpec,
//! };
//!
//! # async fn run(source: &dyn MetricSource) -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig {
//!     evaluators: vec![EvaluatorSpec::new("reliability", "slo")
//!         .with_slo(SloSpec::ratio("availability", 0.999, "30d"))],
//!     ..EngineConfig::default()
//! };
//!
//! let orchestrator = Orchestrator::new(config, &EvaluatorRegistry::with_defaults())?;
//! let end = chrono::Utc::now();
//! let start = end - chrono::Duration::hours(1);
//! let report = orchestrator.run(source, start, end).await?;
//! println!("{}: {} alerts", report.status, report.alerts.len());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod alerts;
pub mod config;
pub mod error;
pub mod evaluators;
pub mod orchestrator;
pub mod registry;
pub mod snapshot;

pub use alerts::{AlertCondition, AlertEngine, AlertRule};
pub use config::{
    parse_duration, AlertingConfig, ComparisonOp, DriftSpec, EngineConfig, EvaluatorSpec, SloSpec,
    ThresholdSpec,
};
pub use error::{EvalError, EvalResult};
pub use evaluators::{
    ComplianceEvaluator, DriftEvaluator, Evaluator, PerformanceEvaluator, ReliabilityEvaluator,
    SafetyEvaluator,
};
pub use orchestrator::{Orchestrator, RunEvent, RunPhase};
pub use registry::{EvaluatorFactory, EvaluatorRegistry};
pub use snapshot::{MetricSnapshot, MetricSource};
