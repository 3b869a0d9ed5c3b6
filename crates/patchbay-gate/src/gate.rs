use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use patchbay_types::FieldIssue;

use crate::config::GateConfig;
use crate::error::{GateError, GateOutcome};
use crate::schema::Validator;
use crate::stage::{Candidate, GateStage, StageDecision, StageResult};
use crate::stages::{SchemaStage, ShapeStage};

// ---------------------------------------------------------------------------
// GateResult
// ---------------------------------------------------------------------------

/// The outcome of running a candidate through the full gate pipeline.
#[derive(Clone, Debug)]
pub struct GateResult {
    /// Per-stage results in evaluation order.
    pub stage_results: Vec<StageResult>,
    /// Total wall-clock time for the pipeline evaluation.
    pub elapsed: Duration,
}

impl GateResult {
    /// Returns `true` if every stage passed.
    pub fn is_accepted(&self) -> bool {
        self.stage_results.iter().all(|r| r.passed)
    }

    /// Every issue reported, in stage order.
    pub fn issues(&self) -> Vec<FieldIssue> {
        self.stage_results
            .iter()
            .flat_map(|r| r.issues.iter().cloned())
            .collect()
    }

    /// Convert into `Ok(())` or `GateError::Invalid` carrying every issue.
    pub fn into_outcome(self) -> GateOutcome<()> {
        if self.is_accepted() {
            Ok(())
        } else {
            Err(GateError::Invalid {
                issues: self.issues(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// ChangeGate
// ---------------------------------------------------------------------------

/// The change gate: a configurable pipeline of stages that every change and
/// document passes through before it is queued, recorded or written.
pub struct ChangeGate {
    stages: Vec<Box<dyn GateStage>>,
    config: GateConfig,
}

impl ChangeGate {
    /// Create a new gate with the given configuration.
    ///
    /// Starts with an empty pipeline. Use [`Self::add_stage`] to add stages,
    /// or [`Self::with_default_stages`] for the standard pipeline.
    pub fn new(config: GateConfig) -> Self {
        Self {
            stages: Vec::new(),
            config,
        }
    }

    /// Create a gate with the shape stage only.
    pub fn with_default_stages(config: GateConfig) -> Self {
        let mut gate = Self::new(config);
        gate.add_stage(Box::new(ShapeStage));
        gate
    }

    /// Create a gate running Shape -> Schema, with schemas from `validator`.
    pub fn with_validator(config: GateConfig, validator: Arc<dyn Validator>) -> Self {
        let mut gate = Self::with_default_stages(config);
        gate.add_stage(Box::new(SchemaStage::new(validator)));
        gate
    }

    /// Append a stage to the end of the pipeline.
    pub fn add_stage(&mut self, stage: Box<dyn GateStage>) {
        self.stages.push(stage);
    }

    /// The current configuration.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Number of stages in the pipeline.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Evaluate a candidate through the pipeline.
    ///
    /// Unless `fail_fast` is set every stage runs, so the result lists every
    /// offending field across all stages.
    pub fn evaluate(&self, candidate: &Candidate<'_>) -> GateOutcome<GateResult> {
        let pipeline_start = Instant::now();

        let mut stage_results = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let stage_start = Instant::now();
            let decision = stage.evaluate(candidate)?;
            let elapsed = stage_start.elapsed();

            let (passed, issues) = match decision {
                StageDecision::Pass => (true, Vec::new()),
                StageDecision::Fail { issues } => (false, issues),
            };
            if !passed {
                debug!(stage = stage.name(), issues = issues.len(), "stage rejected candidate");
            }

            stage_results.push(StageResult {
                stage_name: stage.name().to_string(),
                passed,
                issues,
                elapsed,
            });

            if !passed && self.config.fail_fast {
                break;
            }
        }

        Ok(GateResult {
            stage_results,
            elapsed: pipeline_start.elapsed(),
        })
    }

    /// Evaluate and fail with [`GateError::Invalid`] if any stage rejected.
    pub fn check<'a>(&self, candidate: impl Into<Candidate<'a>>) -> GateOutcome<()> {
        self.evaluate(&candidate.into())?.into_outcome()
    }

    /// Check several candidates, prefixing each issue with `<parent>.<index>`.
    pub fn check_all<'a, I>(&self, parent: &str, candidates: I) -> GateOutcome<()>
    where
        I: IntoIterator<Item = Candidate<'a>>,
    {
        let mut issues = Vec::new();
        for (i, candidate) in candidates.into_iter().enumerate() {
            let prefix = format!("{parent}.{i}");
            issues.extend(
                self.evaluate(&candidate)?
                    .issues()
                    .into_iter()
                    .map(|issue| issue.nested(&prefix)),
            );
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(GateError::Invalid { issues })
        }
    }
}

impl Default for ChangeGate {
    fn default() -> Self {
        Self::with_default_stages(GateConfig::default())
    }
}

impl std::fmt::Debug for ChangeGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeGate")
            .field("stages", &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}
