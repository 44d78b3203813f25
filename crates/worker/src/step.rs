//! Worker steps and their exit codes.

use labelchain_core::types::Timestamp;
use labelchain_pipeline::chain::{run_chain_step, ChainOutcome};
use labelchain_pipeline::context::PipelineContext;
use labelchain_pipeline::error::PipelineError;
use labelchain_pipeline::preprocess::{preprocess_drop, PreprocessReport};
use labelchain_pipeline::trigger::{handle_trigger, TriggerOutcome};

pub const EXIT_OK: u8 = 0;
pub const EXIT_FATAL: u8 = 1;
/// `EX_TEMPFAIL` from sysexits.h; the scheduler may re-run the invocation.
pub const EXIT_TEMPFAIL: u8 = 75;

/// Which part of the chain an invocation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Classify an inbound event and start the pipeline if needed.
    Trigger,
    /// Crop drop-bucket images into the job-input bucket.
    Preprocess,
    /// Resolve the chain and submit the next labeling job.
    Chain,
    /// Preprocess followed by chain, as one pipeline execution runs them.
    Pipeline,
}

impl Step {
    pub fn from_name(name: &str) -> Result<Self, String> {
        match name {
            "trigger" => Ok(Self::Trigger),
            "preprocess" => Ok(Self::Preprocess),
            "chain" => Ok(Self::Chain),
            "pipeline" => Ok(Self::Pipeline),
            other => Err(format!(
                "Unknown step '{other}'. Must be one of: trigger, preprocess, chain, pipeline"
            )),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::Preprocess => "preprocess",
            Self::Chain => "chain",
            Self::Pipeline => "pipeline",
        }
    }

    /// Whether the step consumes an event payload.
    pub fn needs_event(self) -> bool {
        matches!(self, Self::Trigger)
    }
}

/// What a completed step did.
#[derive(Debug, Default)]
pub struct StepReport {
    pub trigger: Option<TriggerOutcome>,
    pub preprocess: Option<PreprocessReport>,
    pub chain: Option<ChainOutcome>,
}

impl StepReport {
    /// Exit code for a step that returned without error.
    ///
    /// Images that failed for a transient reason are picked up by a re-run,
    /// so they ask for one. Failures that are all input errors are fatal.
    pub fn exit_code(&self) -> u8 {
        match &self.preprocess {
            Some(report) if report.has_retryable_failures() => EXIT_TEMPFAIL,
            Some(report) if report.has_failures() => EXIT_FATAL,
            _ => EXIT_OK,
        }
    }
}

/// Exit code for a step that failed.
pub fn error_exit_code(err: &PipelineError) -> u8 {
    if err.is_retryable() {
        EXIT_TEMPFAIL
    } else {
        EXIT_FATAL
    }
}

/// Run `step` against `ctx`.
///
/// `event` is only read by [`Step::Trigger`]; a missing event there is
/// treated as a generic trigger.
pub async fn run_step(
    ctx: &PipelineContext,
    step: Step,
    event: Option<&serde_json::Value>,
    now: Timestamp,
) -> Result<StepReport, PipelineError> {
    let mut report = StepReport::default();

    match step {
        Step::Trigger => {
            let generic = serde_json::Value::Object(Default::default());
            let outcome = handle_trigger(ctx, event.unwrap_or(&generic), now).await?;
            report.trigger = Some(outcome);
        }
        Step::Preprocess => {
            report.preprocess = Some(preprocess_drop(ctx).await?);
        }
        Step::Chain => {
            report.chain = Some(run_chain_step(ctx, now).await?);
        }
        Step::Pipeline => {
            let preprocessed = preprocess_drop(ctx).await?;
            if preprocessed.has_failures() {
                tracing::warn!(
                    failed = preprocessed.failed.len(),
                    "Some images failed preprocessing; continuing with the chain step",
                );
            }
            report.preprocess = Some(preprocessed);
            report.chain = Some(run_chain_step(ctx, now).await?);
        }
    }

    Ok(report)
}
