//! Inbound trigger events and the decision whether to probe the chain.
//!
//! Raw event payloads are parsed once into [`TriggerEvent`]. Anything that is
//! not a labeling-job status change notification is [`TriggerEvent::Generic`]
//! (manual runs, object-created notifications, schedules).

use serde::Deserialize;

use crate::error::CoreError;
use crate::idempotency::idempotency_token;
use crate::job::JobSummary;
use crate::naming::{pipeline_execution_display_name, pipeline_name};
use crate::types::Timestamp;

/// `detail-type` carried by labeling-job status change notifications.
pub const STATUS_CHANGE_DETAIL_TYPE: &str = "SageMaker Ground Truth Labeling Job State Change";

/// A parsed trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerEvent {
    /// A labeling job changed status.
    StatusChangeNotification { job_arn: String },
    /// Any other invocation.
    Generic,
}

/// Fields inspected on the raw payload; everything else is ignored.
#[derive(Debug, Default, Deserialize)]
struct RawEvent {
    #[serde(rename = "detail-type")]
    detail_type: Option<String>,
    resources: Option<Vec<String>>,
}

impl TriggerEvent {
    /// Parse a raw JSON event.
    ///
    /// Non-object payloads (e.g. an empty test event `null`) are generic. A
    /// status change notification without any resource is malformed.
    pub fn parse(payload: &serde_json::Value) -> Result<Self, CoreError> {
        if !payload.is_object() {
            return Ok(Self::Generic);
        }

        let raw: RawEvent = serde_json::from_value(payload.clone())
            .map_err(|e| CoreError::MalformedEvent(e.to_string()))?;

        if raw.detail_type.as_deref() != Some(STATUS_CHANGE_DETAIL_TYPE) {
            return Ok(Self::Generic);
        }

        // Missing, null and empty resources are all the same defect.
        raw.resources
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(|job_arn| Self::StatusChangeNotification { job_arn })
            .ok_or_else(|| {
                CoreError::MalformedEvent(
                    "status change notification lists no resources".to_string(),
                )
            })
    }

    /// The job ARN a notification refers to.
    pub fn job_arn(&self) -> Option<&str> {
        match self {
            Self::StatusChangeNotification { job_arn } => Some(job_arn),
            Self::Generic => None,
        }
    }
}

/// Outcome of classifying a trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerDecision {
    pub attempt: bool,
    pub job_arn: Option<String>,
}

/// Decide whether a trigger should start a resolution run.
///
/// Generic triggers always probe the chain. A notification only does so
/// when the referenced job is among `recent_jobs`, has finished
/// (`Completed`/`Stopped`), and left unlabeled or permanently failed items
/// behind. An unknown job never triggers a run.
pub fn classify(event: &TriggerEvent, recent_jobs: &[JobSummary]) -> TriggerDecision {
    match event {
        TriggerEvent::Generic => TriggerDecision {
            attempt: true,
            job_arn: None,
        },
        TriggerEvent::StatusChangeNotification { job_arn } => {
            let attempt = recent_jobs
                .iter()
                .find(|job| &job.arn == job_arn)
                .is_some_and(JobSummary::needs_chaining);
            TriggerDecision {
                attempt,
                job_arn: Some(job_arn.clone()),
            }
        }
    }
}

/// Description attached to every triggered pipeline execution.
pub const PIPELINE_EXECUTION_DESCRIPTION: &str =
    "Task to prepare new drop images for labeling with Ground Truth";

/// Request to start the preprocessing-and-chain pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineExecutionRequest {
    pub pipeline_name: String,
    pub display_name: String,
    pub description: String,
    /// Deduplication key; identical within one rounding window.
    pub client_request_token: String,
}

impl PipelineExecutionRequest {
    /// Build the request for a trigger firing at `now`.
    pub fn for_trigger(
        project_prefix: &str,
        now: Timestamp,
        window_secs: u32,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            pipeline_name: pipeline_name(project_prefix),
            display_name: pipeline_execution_display_name(project_prefix, now),
            description: PIPELINE_EXECUTION_DESCRIPTION.to_string(),
            client_request_token: idempotency_token(project_prefix, now, window_secs)?,
        })
    }
}
