//! Evaluation run orchestration.
//!
//! One run moves through `Collecting -> Evaluating -> Aggregating` and
//! ends `Completed` or `PartiallyFailed`. Evaluator failures are isolated
//! to the evaluator that raised them; collector failures degrade the run
//! to a partial snapshot. A run always produces a report unless it was
//! cancelled, and a new run never touches a prior run's report.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use warden_types::{
    Alert, EvaluationReport, EvaluationResult, EvaluationStatus, RunStatus,
};

use crate::alerts::{AlertEngine, AlertRule};
use crate::config::EngineConfig;
use crate::error::{EvalError, EvalResult};
use crate::evaluators::Evaluator;
use crate::registry::EvaluatorRegistry;
use crate::snapshot::{MetricSnapshot, MetricSource};

/// Phases of one evaluation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Collecting,
    Evaluating,
    Aggregating,
    Completed,
    PartiallyFailed,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunPhase::Idle => write!(f, "idle"),
            RunPhase::Collecting => write!(f, "collecting"),
            RunPhase::Evaluating => write!(f, "evaluating"),
            RunPhase::Aggregating => write!(f, "aggregating"),
            RunPhase::Completed => write!(f, "completed"),
            RunPhase::PartiallyFailed => write!(f, "partially_failed"),
        }
    }
}

/// Events published over the orchestrator's broadcast stream.
///
/// Consumers (report writers, enrichment, dashboards) observe runs
/// through this one-way stream; nothing they do feeds back into the
/// core.
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// A run began.
    RunStarted { run_id: Uuid },

    /// The run entered a new phase.
    PhaseChanged { run_id: Uuid, phase: RunPhase },

    /// The metric snapshot was taken.
    SnapshotCollected {
        run_id: Uuid,
        collected: usize,
        missing: Vec<String>,
    },

    /// One evaluator finished (in any status).
    EvaluatorCompleted {
        run_id: Uuid,
        evaluator: String,
        status: EvaluationStatus,
    },

    /// An alert was derived.
    AlertRaised { run_id: Uuid, alert: Box<Alert> },

    /// The run finished and its report is final.
    RunCompleted { run_id: Uuid, status: RunStatus },
}

/// Owns the configured evaluators and drives evaluation runs.
pub struct Orchestrator {
    config: EngineConfig,
    evaluators: Vec<Arc<dyn Evaluator>>,
    alert_engine: AlertEngine,
    cancelled: AtomicBool,
    event_tx: broadcast::Sender<RunEvent>,
}

impl Orchestrator {
    /// Build the orchestrator from configuration, constructing each
    /// evaluator through the registry. Fails fast on any configuration
    /// error, before the first run.
    pub fn new(config: EngineConfig, registry: &EvaluatorRegistry) -> EvalResult<Self> {
        config.validate()?;
        let evaluators = config
            .evaluators
            .iter()
            .map(|spec| registry.build(spec))
            .collect::<EvalResult<Vec<_>>>()?;
        Self::with_evaluators(config, evaluators)
    }

    /// Build from pre-constructed evaluators. Used when a deployment
    /// needs to keep concrete handles (e.g. to refresh drift baselines).
    pub fn with_evaluators(
        config: EngineConfig,
        evaluators: Vec<Arc<dyn Evaluator>>,
    ) -> EvalResult<Self> {
        config.validate()?;
        let alert_engine = AlertEngine::new(AlertRule::default_rules(&config.alerting));
        let (event_tx, _) = broadcast::channel(256);
        Ok(Self {
            config,
            evaluators,
            alert_engine,
            cancelled: AtomicBool::new(false),
            event_tx,
        })
    }

    /// Replace the alert rules.
    pub fn set_alert_rules(&mut self, rules: Vec<AlertRule>) {
        self.alert_engine = AlertEngine::new(rules);
    }

    /// Subscribe to run events.
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.event_tx.subscribe()
    }

    /// Configured evaluators, in report order.
    pub fn evaluators(&self) -> &[Arc<dyn Evaluator>] {
        &self.evaluators
    }

    /// Union of the metrics the configured evaluators need, in name
    /// order.
    pub fn required_metrics(&self) -> Vec<String> {
        let mut metrics: Vec<String> = self
            .evaluators
            .iter()
            .flat_map(|e| e.required_metrics())
            .collect();
        metrics.sort();
        metrics.dedup();
        metrics
    }

    /// Cancel the in-flight run at its next phase boundary. The
    /// cancelled run discards its partial report and returns
    /// [`EvalError::Cancelled`].
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Execute one evaluation run over `[start, end)`.
    ///
    /// Runs are independent: identical snapshots produce identical
    /// reports (up to ids and timestamps), and nothing here mutates
    /// state a prior run's report depends on.
    #[instrument(skip(self, source))]
    pub async fn run(
        &self,
        source: &dyn MetricSource,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EvalResult<EvaluationReport> {
        self.cancelled.store(false, Ordering::SeqCst);
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        self.emit(RunEvent::RunStarted { run_id });

        self.emit(RunEvent::PhaseChanged {
            run_id,
            phase: RunPhase::Collecting,
        });
        let snapshot = self.collect_snapshot(source, start, end).await;
        self.emit(RunEvent::SnapshotCollected {
            run_id,
            collected: snapshot.len(),
            missing: snapshot.missing().to_vec(),
        });
        self.ensure_not_cancelled()?;

        self.emit(RunEvent::PhaseChanged {
            run_id,
            phase: RunPhase::Evaluating,
        });
        let results = if self.config.parallel {
            join_all(
                self.evaluators
                    .iter()
                    .map(|evaluator| self.evaluate_one(evaluator, &snapshot)),
            )
            .await
        } else {
            let mut results = Vec::with_capacity(self.evaluators.len());
            for evaluator in &self.evaluators {
                results.push(self.evaluate_one(evaluator, &snapshot).await);
            }
            results
        };
        for result in &results {
            self.emit(RunEvent::EvaluatorCompleted {
                run_id,
                evaluator: result.name.clone(),
                status: result.status,
            });
        }
        self.ensure_not_cancelled()?;

        self.emit(RunEvent::PhaseChanged {
            run_id,
            phase: RunPhase::Aggregating,
        });
        let status = if snapshot.missing().is_empty()
            && results
                .iter()
                .all(|r| r.status == EvaluationStatus::Completed)
        {
            RunStatus::Completed
        } else {
            RunStatus::PartiallyFailed
        };
        let alerts = self.alert_engine.derive(&results);
        for alert in &alerts {
            self.emit(RunEvent::AlertRaised {
                run_id,
                alert: Box::new(alert.clone()),
            });
        }

        let report = EvaluationReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            status,
            results,
            alerts,
            missing_metrics: snapshot.missing().to_vec(),
        };
        info!(
            run_id = %run_id,
            status = %report.status,
            evaluators = report.results.len(),
            alerts = report.alerts.len(),
            "Evaluation run finished"
        );
        self.emit(RunEvent::RunCompleted { run_id, status });
        Ok(report)
    }

    /// Snapshot the required metrics. A failed source degrades to a
    /// partial snapshot with the gap recorded, never an aborted run.
    async fn collect_snapshot(
        &self,
        source: &dyn MetricSource,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> MetricSnapshot {
        let required = self.required_metrics();
        let mut snapshot = MetricSnapshot::new(start, end);
        match source.collect(&required, start, end).await {
            Ok(windows) => {
                for (_, window) in windows {
                    snapshot.insert(window);
                }
            }
            Err(reason) => {
                warn!(reason = %reason, "Metric source failed; continuing with partial snapshot");
            }
        }
        for metric in &required {
            if snapshot.window(metric).is_none() {
                snapshot.record_missing(metric.clone());
            }
        }
        snapshot
    }

    /// Run one evaluator inside the configured time bound. Failures and
    /// timeouts degrade to a failed result for this evaluator only.
    async fn evaluate_one(
        &self,
        evaluator: &Arc<dyn Evaluator>,
        snapshot: &MetricSnapshot,
    ) -> EvaluationResult {
        let timeout = self.config.evaluator_timeout;
        match tokio::time::timeout(timeout, evaluator.evaluate(snapshot)).await {
            Ok(Ok(result)) => result,
            Ok(Err(error)) => {
                warn!(evaluator = evaluator.name(), error = %error, "Evaluator failed");
                EvaluationResult::failed(evaluator.kind(), evaluator.name(), error.to_string())
            }
            Err(_) => {
                let error = EvalError::Timeout {
                    name: evaluator.name().to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                };
                warn!(evaluator = evaluator.name(), error = %error, "Evaluator timed out");
                EvaluationResult::failed(evaluator.kind(), evaluator.name(), error.to_string())
            }
        }
    }

    fn ensure_not_cancelled(&self) -> EvalResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            warn!("Evaluation run cancelled; discarding partial report");
            return Err(EvalError::Cancelled);
        }
        Ok(())
    }

    fn emit(&self, event: RunEvent) {
        let _ = self.event_tx.send(event);
    }
}
