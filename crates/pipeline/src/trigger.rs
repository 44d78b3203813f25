//! Trigger handling.
//!
//! Turns a raw inbound event into at most one pipeline execution. Repeated
//! triggers inside the same rounding window carry the same client request
//! token, so the backend starts the pipeline only once.

use labelchain_core::trigger::{classify, PipelineExecutionRequest, TriggerEvent};
use labelchain_core::types::Timestamp;

use crate::context::PipelineContext;
use crate::error::PipelineError;

/// Outcome of one trigger invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The chain has nothing to do for this event.
    Skipped { job_arn: Option<String> },
    /// A pipeline execution was requested.
    Started {
        execution_arn: String,
        client_request_token: String,
    },
}

/// Handle one raw event payload.
pub async fn handle_trigger(
    ctx: &PipelineContext,
    payload: &serde_json::Value,
    now: Timestamp,
) -> Result<TriggerOutcome, PipelineError> {
    let event = TriggerEvent::parse(payload)?;
    let prefix = ctx.project_prefix();

    let recent_jobs = match &event {
        TriggerEvent::StatusChangeNotification { job_arn } => {
            tracing::info!(job_arn = %job_arn, "Triggered by labeling job status change");
            ctx.backend.list_jobs(prefix, ctx.job_history_limit).await?
        }
        TriggerEvent::Generic => {
            tracing::info!("Triggered manually or by another event source");
            Vec::new()
        }
    };

    if let Some(job) = event
        .job_arn()
        .and_then(|arn| recent_jobs.iter().find(|j| j.arn == arn))
    {
        tracing::info!(
            job_name = %job.name,
            status = %job.status,
            total_labeled = job.label_counters.total_labeled,
            unlabeled = job.label_counters.unlabeled,
            failed_non_retryable = job.label_counters.failed_non_retryable,
            "Found notified labeling job",
        );
    }

    let decision = classify(&event, &recent_jobs);
    if !decision.attempt {
        tracing::info!(job_arn = ?decision.job_arn, "Pipeline not triggered");
        return Ok(TriggerOutcome::Skipped {
            job_arn: decision.job_arn,
        });
    }

    let request = PipelineExecutionRequest::for_trigger(prefix, now, ctx.token_window_secs)?;
    let execution_arn = ctx.backend.start_pipeline_execution(&request).await?;
    tracing::info!(
        pipeline = %request.pipeline_name,
        client_request_token = %request.client_request_token,
        execution_arn = %execution_arn,
        "Pipeline execution triggered",
    );

    Ok(TriggerOutcome::Started {
        execution_arn,
        client_request_token: request.client_request_token,
    })
}
