//! Engine configuration.
//!
//! Configuration is validated once, at orchestrator construction, before
//! any run starts. A malformed threshold or SLO fails the whole setup
//! rather than surfacing mid-run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use warden_drift::DriftMethod;
use warden_types::{Aggregation, SloDefinition, SloObjective};

use crate::error::{EvalError, EvalResult};

/// Tolerance when checking an explicit error-budget override against the
/// value derived from the target.
const BUDGET_OVERRIDE_TOLERANCE: f64 = 1e-9;

/// Comparison that, when true for the observed value, violates the
/// threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl ComparisonOp {
    /// Whether the observed value violates the threshold.
    pub fn violated(&self, observed: f64, threshold: f64) -> bool {
        match self {
            ComparisonOp::GreaterThan => observed > threshold,
            ComparisonOp::GreaterThanOrEqual => observed >= threshold,
            ComparisonOp::LessThan => observed < threshold,
            ComparisonOp::LessThanOrEqual => observed <= threshold,
        }
    }
}

impl std::fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComparisonOp::GreaterThan => write!(f, ">"),
            ComparisonOp::GreaterThanOrEqual => write!(f, ">="),
            ComparisonOp::LessThan => write!(f, "<"),
            ComparisonOp::LessThanOrEqual => write!(f, "<="),
        }
    }
}

/// One static threshold check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSpec {
    /// Metric to aggregate.
    pub metric: String,

    /// Aggregation to apply to the metric window.
    pub aggregation: Aggregation,

    /// Comparison that defines a violation.
    pub op: ComparisonOp,

    /// Value the aggregate is compared against.
    pub threshold: f64,

    /// Marks a safety threshold whose failure makes the whole result
    /// non-recoverable.
    #[serde(default)]
    pub critical: bool,
}

impl ThresholdSpec {
    pub fn new(
        metric: impl Into<String>,
        aggregation: Aggregation,
        op: ComparisonOp,
        threshold: f64,
    ) -> Self {
        Self {
            metric: metric.into(),
            aggregation,
            op,
            threshold,
            critical: false,
        }
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    /// Condition id this check reports under, unique per configured
    /// threshold.
    pub fn condition(&self) -> String {
        format!(
            "{} {} {} {}",
            self.metric, self.aggregation, self.op, self.threshold
        )
    }
}

/// One SLO entry for a reliability evaluator.
///
/// Either `target` (success-ratio objective, budget derived as
/// `1 - target`) or `bound` + `allowed_violation_fraction` (upper-bound
/// objective, budget supplied directly) must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SloSpec {
    /// Metric carrying the observations.
    pub metric: String,

    /// SLO name; defaults to the metric name.
    #[serde(default)]
    pub name: Option<String>,

    /// Success-ratio target in `(0, 1]`.
    #[serde(default)]
    pub target: Option<f64>,

    /// Upper bound on sample values, for latency-style SLOs.
    #[serde(default)]
    pub bound: Option<f64>,

    /// Allowed violation fraction, required with `bound`.
    #[serde(default)]
    pub allowed_violation_fraction: Option<f64>,

    /// Explicit error-budget override. Accepted only when it matches the
    /// value derived from `target`; a mismatch is a configuration error
    /// rather than something to silently trust.
    #[serde(default)]
    pub error_budget: Option<f64>,

    /// Evaluation window as a duration string (e.g. "30s", "1h", "30d").
    pub window: String,

    /// Human-readable description for reports.
    #[serde(default)]
    pub description: String,
}

impl SloSpec {
    pub fn ratio(metric: impl Into<String>, target: f64, window: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            name: None,
            target: Some(target),
            bound: None,
            allowed_violation_fraction: None,
            error_budget: None,
            window: window.into(),
            description: String::new(),
        }
    }

    pub fn upper_bound(
        metric: impl Into<String>,
        bound: f64,
        allowed_violation_fraction: f64,
        window: impl Into<String>,
    ) -> Self {
        Self {
            metric: metric.into(),
            name: None,
            target: None,
            bound: Some(bound),
            allowed_violation_fraction: Some(allowed_violation_fraction),
            error_budget: None,
            window: window.into(),
            description: String::new(),
        }
    }

    /// SLO name, falling back to the metric name.
    pub fn slo_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.metric)
    }

    /// Build and validate the definition this spec describes.
    pub fn to_definition(&self) -> EvalResult<SloDefinition> {
        let objective = match (self.target, self.bound) {
            (Some(target), None) => {
                if let Some(budget) = self.error_budget {
                    let derived = 1.0 - target;
                    if (budget - derived).abs() > BUDGET_OVERRIDE_TOLERANCE {
                        return Err(EvalError::Configuration(format!(
                            "SLO '{}' supplies error_budget {} but target {} derives {}",
                            self.slo_name(),
                            budget,
                            target,
                            derived
                        )));
                    }
                }
                SloObjective::Ratio { target }
            }
            (None, Some(bound)) => {
                let allowed = self.allowed_violation_fraction.ok_or_else(|| {
                    EvalError::Configuration(format!(
                        "SLO '{}' sets a bound without an allowed_violation_fraction",
                        self.slo_name()
                    ))
                })?;
                SloObjective::UpperBound {
                    bound,
                    allowed_violation_fraction: allowed,
                }
            }
            _ => {
                return Err(EvalError::Configuration(format!(
                    "SLO '{}' must set exactly one of target or bound",
                    self.slo_name()
                )))
            }
        };

        let definition = SloDefinition::new(
            self.slo_name(),
            objective,
            parse_duration(&self.window)?,
            self.description.clone(),
        );
        definition
            .validate()
            .map_err(|e| EvalError::Configuration(e.to_string()))?;
        Ok(definition)
    }
}

/// One metric/threshold pair for a drift evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftSpec {
    /// Metric whose distribution is watched.
    pub metric: String,

    /// Methods to run for this metric.
    pub detection_methods: Vec<DriftMethod>,

    /// Score above which the metric counts as drifted.
    pub adaptation_threshold: f64,
}

impl DriftSpec {
    pub fn new(
        metric: impl Into<String>,
        detection_methods: Vec<DriftMethod>,
        adaptation_threshold: f64,
    ) -> Self {
        Self {
            metric: metric.into(),
            detection_methods,
            adaptation_threshold,
        }
    }
}

/// One configured evaluator instance.
///
/// `kind` is a registry key, not an enum: deployments can register
/// factories for their own kinds alongside the five built-in ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorSpec {
    /// Registry key selecting the factory ("reliability", "drift", ...).
    pub kind: String,

    /// Instance name, unique within the engine.
    pub name: String,

    /// SLOs for reliability evaluators.
    #[serde(default)]
    pub slos: Vec<SloSpec>,

    /// Static thresholds for performance, safety, and compliance
    /// evaluators.
    #[serde(default)]
    pub thresholds: Vec<ThresholdSpec>,

    /// Metric/method pairs for drift evaluators.
    #[serde(default)]
    pub drift: Vec<DriftSpec>,

    /// Regulatory standard identifier, required for compliance
    /// evaluators.
    #[serde(default)]
    pub standard: Option<String>,
}

impl EvaluatorSpec {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            slos: Vec::new(),
            thresholds: Vec::new(),
            drift: Vec::new(),
            standard: None,
        }
    }

    pub fn with_slo(mut self, slo: SloSpec) -> Self {
        self.slos.push(slo);
        self
    }

    pub fn with_threshold(mut self, threshold: ThresholdSpec) -> Self {
        self.thresholds.push(threshold);
        self
    }

    pub fn with_drift(mut self, drift: DriftSpec) -> Self {
        self.drift.push(drift);
        self
    }

    pub fn with_standard(mut self, standard: impl Into<String>) -> Self {
        self.standard = Some(standard.into());
        self
    }

    fn validate(&self) -> EvalResult<()> {
        if self.name.is_empty() {
            return Err(EvalError::Configuration(
                "evaluator name must not be empty".to_string(),
            ));
        }
        if self.kind.is_empty() {
            return Err(EvalError::Configuration(format!(
                "evaluator '{}' has an empty kind",
                self.name
            )));
        }

        match self.kind.as_str() {
            "reliability" => {
                if self.slos.is_empty() {
                    return Err(EvalError::Configuration(format!(
                        "reliability evaluator '{}' configures no SLOs",
                        self.name
                    )));
                }
            }
            "performance" | "safety" => {
                if self.thresholds.is_empty() {
                    return Err(EvalError::Configuration(format!(
                        "{} evaluator '{}' configures no thresholds",
                        self.kind, self.name
                    )));
                }
            }
            "drift" => {
                if self.drift.is_empty() {
                    return Err(EvalError::Configuration(format!(
                        "drift evaluator '{}' configures no metrics",
                        self.name
                    )));
                }
            }
            "compliance" => {
                if self.thresholds.is_empty() {
                    return Err(EvalError::Configuration(format!(
                        "compliance evaluator '{}' configures no thresholds",
                        self.name
                    )));
                }
                if self.standard.as_deref().unwrap_or("").is_empty() {
                    return Err(EvalError::Configuration(format!(
                        "compliance evaluator '{}' names no standard",
                        self.name
                    )));
                }
            }
            // Custom kinds validate their shape in their factory.
            _ => {}
        }

        for slo in &self.slos {
            slo.to_definition()?;
        }

        let mut conditions = std::collections::BTreeSet::new();
        for threshold in &self.thresholds {
            if let Aggregation::Percentile(p) = threshold.aggregation {
                if !(0.0..=1.0).contains(&p) {
                    return Err(EvalError::Configuration(format!(
                        "evaluator '{}' threshold on '{}' uses percentile {} outside [0, 1]",
                        self.name, threshold.metric, p
                    )));
                }
            }
            if !conditions.insert(threshold.condition()) {
                return Err(EvalError::Configuration(format!(
                    "evaluator '{}' configures duplicate threshold '{}'",
                    self.name,
                    threshold.condition()
                )));
            }
        }

        let mut pairs = std::collections::BTreeSet::new();
        for drift in &self.drift {
            if drift.detection_methods.is_empty() {
                return Err(EvalError::Configuration(format!(
                    "drift evaluator '{}' lists no detection methods for '{}'",
                    self.name, drift.metric
                )));
            }
            if drift.adaptation_threshold <= 0.0 {
                return Err(EvalError::Configuration(format!(
                    "drift evaluator '{}' threshold for '{}' must be positive",
                    self.name, drift.metric
                )));
            }
            for method in &drift.detection_methods {
                if !pairs.insert((drift.metric.clone(), *method)) {
                    return Err(EvalError::Configuration(format!(
                        "drift evaluator '{}' configures '{}' twice for method {}",
                        self.name, drift.metric, method
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Alert derivation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertingConfig {
    /// Burn-rate multiple above which a warning alert is raised for SLOs
    /// that are not yet exhausted.
    pub burn_rate_warning: f64,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            burn_rate_warning: 2.0,
        }
    }
}

/// Full engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Evaluator instances, in the order their results appear in reports.
    pub evaluators: Vec<EvaluatorSpec>,

    /// Time bound applied to each evaluator invocation.
    #[serde(default = "default_evaluator_timeout")]
    pub evaluator_timeout: Duration,

    /// Run evaluators concurrently. Report ordering is by configuration
    /// order either way.
    #[serde(default)]
    pub parallel: bool,

    /// Alert derivation settings.
    #[serde(default)]
    pub alerting: AlertingConfig,
}

fn default_evaluator_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            evaluators: Vec::new(),
            evaluator_timeout: default_evaluator_timeout(),
            parallel: false,
            alerting: AlertingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Validate the whole configuration. Called at orchestrator
    /// construction; any error here is fatal before the first run.
    pub fn validate(&self) -> EvalResult<()> {
        if self.evaluator_timeout.is_zero() {
            return Err(EvalError::Configuration(
                "evaluator_timeout must be non-zero".to_string(),
            ));
        }

        let mut names = std::collections::BTreeSet::new();
        for spec in &self.evaluators {
            spec.validate()?;
            if !names.insert(spec.name.as_str()) {
                return Err(EvalError::Configuration(format!(
                    "duplicate evaluator name '{}'",
                    spec.name
                )));
            }
        }
        Ok(())
    }
}

/// Parse a duration string with an `ms`, `s`, `m`, `h`, or `d` suffix.
pub fn parse_duration(input: &str) -> EvalResult<Duration> {
    let trimmed = input.trim();
    let digits = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (value, unit) = trimmed.split_at(digits);
    let value: u64 = value
        .parse()
        .map_err(|_| EvalError::Configuration(format!("invalid duration '{input}'")))?;
    let millis = match unit {
        "ms" => value,
        "s" => value * 1_000,
        "m" => value * 60_000,
        "h" => value * 3_600_000,
        "d" => value * 86_400_000,
        _ => {
            return Err(EvalError::Configuration(format!(
                "invalid duration unit in '{input}'"
            )))
        }
    };
    if millis == 0 {
        return Err(EvalError::Configuration(format!(
            "duration '{input}' must be non-zero"
        )));
    }
    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7_200));
        assert_eq!(parse_duration("30d").unwrap(), Duration::from_secs(2_592_000));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("30").is_err());
        assert!(parse_duration("s30").is_err());
        assert!(parse_duration("30 weeks").is_err());
        assert!(parse_duration("0s").is_err());
    }

    #[test]
    fn test_slo_spec_ratio_definition() {
        let spec = SloSpec::ratio("availability", 0.999, "30d");
        let definition = spec.to_definition().unwrap();
        assert_eq!(definition.name, "availability");
        assert!((definition.error_budget() - 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_slo_spec_budget_override_must_match() {
        let mut spec = SloSpec::ratio("availability", 0.95, "30d");
        spec.error_budget = Some(0.05);
        assert!(spec.to_definition().is_ok());

        spec.error_budget = Some(0.10);
        let err = spec.to_definition().unwrap_err();
        assert!(matches!(err, EvalError::Configuration(_)));
    }

    #[test]
    fn test_slo_spec_requires_one_objective() {
        let mut spec = SloSpec::ratio("availability", 0.95, "30d");
        spec.bound = Some(100.0);
        assert!(spec.to_definition().is_err());

        spec.target = None;
        spec.allowed_violation_fraction = None;
        assert!(spec.to_definition().is_err());
    }

    #[test]
    fn test_validate_requires_slos_for_reliability() {
        let config = EngineConfig {
            evaluators: vec![EvaluatorSpec::new("reliability", "slo")],
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EvalError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_requires_standard_for_compliance() {
        let config = EngineConfig {
            evaluators: vec![EvaluatorSpec::new("compliance", "audit").with_threshold(
                ThresholdSpec::new(
                    "bias_score",
                    Aggregation::Mean,
                    ComparisonOp::GreaterThan,
                    0.1,
                ),
            )],
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EvalError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_thresholds() {
        let threshold = ThresholdSpec::new(
            "latency_ms",
            Aggregation::Percentile(0.99),
            ComparisonOp::GreaterThan,
            250.0,
        );
        let config = EngineConfig {
            evaluators: vec![EvaluatorSpec::new("performance", "perf")
                .with_threshold(threshold.clone())
                .with_threshold(threshold)],
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EvalError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let spec = EvaluatorSpec::new("performance", "perf").with_threshold(ThresholdSpec::new(
            "latency_ms",
            Aggregation::Mean,
            ComparisonOp::GreaterThan,
            100.0,
        ));
        let config = EngineConfig {
            evaluators: vec![spec.clone(), spec],
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EvalError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_accepts_full_config() {
        let config = EngineConfig {
            evaluators: vec![
                EvaluatorSpec::new("reliability", "slo")
                    .with_slo(SloSpec::ratio("availability", 0.999, "30d")),
                EvaluatorSpec::new("safety", "guardrails").with_threshold(
                    ThresholdSpec::new(
                        "toxicity_rate",
                        Aggregation::Mean,
                        ComparisonOp::GreaterThan,
                        0.01,
                    )
                    .critical(),
                ),
                EvaluatorSpec::new("drift", "input-drift").with_drift(DriftSpec::new(
                    "prediction_confidence",
                    vec![DriftMethod::Statistical],
                    0.2,
                )),
                EvaluatorSpec::new("compliance", "eu-ai-act")
                    .with_threshold(ThresholdSpec::new(
                        "bias_score",
                        Aggregation::Mean,
                        ComparisonOp::GreaterThan,
                        0.1,
                    ))
                    .with_standard("EU-AI-Act"),
            ],
            ..EngineConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_round_trips_through_serde() {
        let config = EngineConfig {
            evaluators: vec![EvaluatorSpec::new("reliability", "slo")
                .with_slo(SloSpec::ratio("availability", 0.99, "7d"))],
            ..EngineConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
