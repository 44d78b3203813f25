//! Labeling job chain step.
//!
//! Reads the current job history, resolves the chain and, unless a job is
//! already running, submits the next labeling job. All decisions derive
//! from backend state read at the start of the run, so the step can be
//! re-run after any failure.

use labelchain_core::chain::{plan_chain, ChainAction};
use labelchain_core::labeling_request::{label_category_json, LabelingJobRequest, CLASS_LABELS_KEY};
use labelchain_core::types::Timestamp;

use crate::context::PipelineContext;
use crate::error::PipelineError;
use crate::manifest::build_manifest;

/// Outcome of one chain step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// A job is in progress; nothing was submitted.
    Unchanged,
    /// A new labeling job was submitted.
    Submitted {
        action: &'static str,
        job_name: String,
        job_arn: String,
        manifest_uri: String,
    },
}

/// Fail unless the job-input bucket lives in the configured region.
async fn ensure_bucket_region(ctx: &PipelineContext) -> Result<(), PipelineError> {
    let bucket = ctx.input_bucket();
    let actual = ctx.blob.bucket_region(bucket).await?;
    if actual != ctx.profile.region {
        return Err(PipelineError::Config(format!(
            "Bucket {bucket} is in {actual}, expected {}",
            ctx.profile.region
        )));
    }
    Ok(())
}

/// Resolve the chain and submit the next job if one is needed.
pub async fn run_chain_step(
    ctx: &PipelineContext,
    now: Timestamp,
) -> Result<ChainOutcome, PipelineError> {
    ensure_bucket_region(ctx).await?;

    let prefix = ctx.project_prefix();
    let jobs = ctx.backend.list_jobs(prefix, ctx.job_history_limit).await?;
    tracing::info!(project_prefix = prefix, jobs = jobs.len(), "Loaded labeling job history");

    let decision = plan_chain(&jobs, prefix, ctx.input_bucket(), now)?;

    match &decision.action {
        ChainAction::NoAction => {
            tracing::info!(
                project_prefix = prefix,
                "A labeling job is already in progress; new images join it automatically",
            );
        }
        ChainAction::NewJob => {
            tracing::info!(
                project_prefix = prefix,
                "No prior labeling job found; creating the first job",
            );
        }
        ChainAction::InvalidJobs => {
            tracing::warn!(
                project_prefix = prefix,
                "No job to chain from (invalid jobs); creating a new job",
            );
        }
        ChainAction::NewChainJob { source } => {
            tracing::info!(
                source_job = %source.name,
                source_status = %source.status,
                total_labeled = source.label_counters.total_labeled,
                unlabeled = source.label_counters.unlabeled,
                failed_non_retryable = source.label_counters.failed_non_retryable,
                output_manifest = ?source.output_manifest_uri,
                workteam_arn = %source.workteam_arn,
                "Chaining from prior labeling job",
            );
        }
    }
    if !decision.action.creates_job() {
        return Ok(ChainOutcome::Unchanged);
    }

    // Validate before touching the bucket so a bad request leaves nothing behind.
    let request = LabelingJobRequest::build(&ctx.profile, &decision)?;
    let labels = label_category_json(&ctx.label_classes)?;

    if decision.action.requires_manifest() {
        build_manifest(ctx.blob.as_ref(), ctx.input_bucket()).await?;
    }

    ctx.blob
        .put(ctx.input_bucket(), CLASS_LABELS_KEY, labels, "application/json")
        .await?;
    tracing::info!(classes = ?ctx.label_classes, "Label categories published");

    let job_arn = ctx.backend.create_labeling_job(&request).await?;
    tracing::info!(
        action = decision.action.as_str(),
        job_name = %request.job_name,
        job_arn = %job_arn,
        manifest_uri = %request.manifest_uri,
        "Labeling job submitted",
    );

    Ok(ChainOutcome::Submitted {
        action: decision.action.as_str(),
        job_name: request.job_name,
        job_arn,
        manifest_uri: request.manifest_uri,
    })
}
