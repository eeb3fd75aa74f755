//! String-keyed evaluator factories.
//!
//! The original platform loaded custom evaluator classes by name at
//! runtime. Here that is an explicit registry populated at startup:
//! factories are keyed by the `kind` string from configuration, and a
//! missing key is a typed error, not a reflection failure.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use warden_drift::{DriftConfig, DriftDetector, DriftMethod, DriftScorer};
use warden_slo::BudgetTracker;

use crate::config::EvaluatorSpec;
use crate::error::{EvalError, EvalResult};
use crate::evaluators::{
    ComplianceEvaluator, DriftEvaluator, Evaluator, PerformanceEvaluator, ReliabilityEvaluator,
    SafetyEvaluator,
};

/// Builds one evaluator instance from its spec.
pub type EvaluatorFactory =
    Arc<dyn Fn(&EvaluatorSpec) -> EvalResult<Arc<dyn Evaluator>> + Send + Sync>;

/// Factories for evaluator kinds, keyed by the `kind` string.
pub struct EvaluatorRegistry {
    factories: BTreeMap<String, EvaluatorFactory>,
}

impl EvaluatorRegistry {
    /// A registry with no factories. Useful when a deployment wants full
    /// control over which kinds exist.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A registry with the five built-in kinds. Drift evaluators built
    /// from it support statistical methods only; use
    /// [`with_scorer`](Self::with_scorer) to enable `ml_model`.
    pub fn with_defaults() -> Self {
        Self::build_defaults(None)
    }

    /// Built-in kinds plus a model-backed scorer for drift evaluators.
    pub fn with_scorer(scorer: Arc<dyn DriftScorer>) -> Self {
        Self::build_defaults(Some(scorer))
    }

    fn build_defaults(scorer: Option<Arc<dyn DriftScorer>>) -> Self {
        let mut registry = Self::empty();
        registry.register("reliability", reliability_factory());
        registry.register("performance", performance_factory());
        registry.register("safety", safety_factory());
        registry.register("drift", drift_factory(scorer));
        registry.register("compliance", compliance_factory());
        registry
    }

    /// Register a factory under a kind key, replacing any previous one.
    pub fn register(&mut self, kind: impl Into<String>, factory: EvaluatorFactory) {
        let kind = kind.into();
        debug!(kind = %kind, "Registered evaluator factory");
        self.factories.insert(kind, factory);
    }

    /// Whether a kind is registered.
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kind keys, in name order.
    pub fn kinds(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Build an evaluator for a spec.
    pub fn build(&self, spec: &EvaluatorSpec) -> EvalResult<Arc<dyn Evaluator>> {
        let factory = self
            .factories
            .get(&spec.kind)
            .ok_or_else(|| EvalError::UnknownEvaluatorType(spec.kind.clone()))?;
        factory(spec)
    }
}

impl Default for EvaluatorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn reliability_factory() -> EvaluatorFactory {
    Arc::new(|spec| {
        let mut slos = Vec::with_capacity(spec.slos.len());
        for slo in &spec.slos {
            slos.push((slo.metric.clone(), Arc::new(slo.to_definition()?)));
        }
        Ok(Arc::new(ReliabilityEvaluator::new(
            &spec.name,
            slos,
            BudgetTracker::default(),
        )))
    })
}

fn performance_factory() -> EvaluatorFactory {
    Arc::new(|spec| {
        Ok(Arc::new(PerformanceEvaluator::new(
            &spec.name,
            spec.thresholds.clone(),
        )))
    })
}

fn safety_factory() -> EvaluatorFactory {
    Arc::new(|spec| {
        Ok(Arc::new(SafetyEvaluator::new(
            &spec.name,
            spec.thresholds.clone(),
        )))
    })
}

fn drift_factory(scorer: Option<Arc<dyn DriftScorer>>) -> EvaluatorFactory {
    Arc::new(move |spec| {
        let wants_model = spec
            .drift
            .iter()
            .any(|d| d.detection_methods.contains(&DriftMethod::MlModel));
        let detector = match &scorer {
            Some(scorer) => DriftDetector::with_scorer(DriftConfig::default(), scorer.clone()),
            None if wants_model => {
                return Err(EvalError::Configuration(format!(
                    "drift evaluator '{}' requests ml_model but no scorer is registered",
                    spec.name
                )))
            }
            None => DriftDetector::new(DriftConfig::default()),
        };
        Ok(Arc::new(DriftEvaluator::new(
            &spec.name,
            detector,
            spec.drift.clone(),
        )))
    })
}

fn compliance_factory() -> EvaluatorFactory {
    Arc::new(|spec| {
        let standard = spec.standard.clone().ok_or_else(|| {
            EvalError::Configuration(format!(
                "compliance evaluator '{}' names no standard",
                spec.name
            ))
        })?;
        Ok(Arc::new(ComplianceEvaluator::new(
            &spec.name,
            standard,
            spec.thresholds.clone(),
        )))
    })
}
