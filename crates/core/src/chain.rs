//! Job chain state resolution.
//!
//! Given the most recent jobs for a project (newest first), decide whether
//! to leave the chain alone, start a fresh job over a newly built manifest,
//! or chain a new job from the output of a finished one.
//!
//! The resolver is a pure function of the job history and the current time,
//! so a failed invocation can simply be re-run.

use crate::error::CoreError;
use crate::job::{JobStatus, JobSummary};
use crate::manifest::{s3_uri, INPUT_MANIFEST_KEY};
use crate::naming::{chained_job_name, new_job_name};
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// ChainAction
// ---------------------------------------------------------------------------

/// Terminal outcome of scanning a job history.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainAction {
    /// A job is already in progress and absorbs new work on its own.
    NoAction,
    /// No prior jobs; start the first job of the chain.
    NewJob,
    /// Continue the chain from a completed or stopped job.
    NewChainJob { source: JobSummary },
    /// History exists but holds nothing to chain from. Handled like
    /// [`ChainAction::NewJob`] so the project never becomes un-labelable.
    InvalidJobs,
}

impl ChainAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoAction => "NO_ACTION",
            Self::NewJob => "NEW_JOB",
            Self::NewChainJob { .. } => "NEW_CHAIN_JOB",
            Self::InvalidJobs => "INVALID_JOBS",
        }
    }

    /// Whether this outcome ends in a job-creation request.
    pub fn creates_job(&self) -> bool {
        !matches!(self, Self::NoAction)
    }

    /// Whether a fresh input manifest has to be built first.
    pub fn requires_manifest(&self) -> bool {
        matches!(self, Self::NewJob | Self::InvalidJobs)
    }
}

/// Classify a job history, newest first.
///
/// - Empty history: [`ChainAction::NewJob`].
/// - Any `InProgress` job: [`ChainAction::NoAction`].
/// - Otherwise the first `Stopping` job before a chainable one is a fatal
///   precondition error, and the first `Completed`/`Stopped` job becomes the
///   chain source. `Failed` jobs are skipped.
/// - Nothing chainable: [`ChainAction::InvalidJobs`].
pub fn resolve_chain(jobs: &[JobSummary]) -> Result<ChainAction, CoreError> {
    if jobs.is_empty() {
        return Ok(ChainAction::NewJob);
    }

    if jobs.iter().any(|job| job.status == JobStatus::InProgress) {
        return Ok(ChainAction::NoAction);
    }

    for job in jobs {
        match job.status {
            JobStatus::Stopping => {
                return Err(CoreError::Precondition(format!(
                    "Labeling job '{}' is stopping; wait for it to stop first",
                    job.name
                )));
            }
            JobStatus::Completed | JobStatus::Stopped => {
                return Ok(ChainAction::NewChainJob { source: job.clone() });
            }
            JobStatus::Failed => continue,
            // Excluded by the scan above.
            JobStatus::InProgress => return Ok(ChainAction::NoAction),
        }
    }

    Ok(ChainAction::InvalidJobs)
}

// ---------------------------------------------------------------------------
// ChainDecision
// ---------------------------------------------------------------------------

/// A resolved action plus the parameters needed to act on it.
///
/// `new_job_name` and `manifest_uri` are `None` only for
/// [`ChainAction::NoAction`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChainDecision {
    pub action: ChainAction,
    pub new_job_name: Option<String>,
    pub manifest_uri: Option<String>,
}

impl ChainDecision {
    /// The job the new one chains from, if any.
    pub fn source_job(&self) -> Option<&JobSummary> {
        match &self.action {
            ChainAction::NewChainJob { source } => Some(source),
            _ => None,
        }
    }
}

/// Resolve the chain and fill in the new job's name and input manifest.
///
/// Fresh jobs point at `s3://{input_bucket}/input.manifest`, which the
/// caller must build before submitting. Chained jobs reuse the source job's
/// output manifest.
pub fn plan_chain(
    jobs: &[JobSummary],
    project_prefix: &str,
    input_bucket: &str,
    now: Timestamp,
) -> Result<ChainDecision, CoreError> {
    let action = resolve_chain(jobs)?;

    let (new_job_name, manifest_uri) = match &action {
        ChainAction::NoAction => (None, None),
        ChainAction::NewJob | ChainAction::InvalidJobs => (
            Some(new_job_name(project_prefix, now)),
            Some(s3_uri(input_bucket, INPUT_MANIFEST_KEY)),
        ),
        ChainAction::NewChainJob { source } => {
            let output = source.output_manifest_uri.clone().ok_or_else(|| {
                CoreError::Precondition(format!(
                    "Labeling job '{}' has no output manifest to chain from",
                    source.name
                ))
            })?;
            (
                Some(chained_job_name(project_prefix, now, source.creation_time)),
                Some(output),
            )
        }
    };

    Ok(ChainDecision {
        action,
        new_job_name,
        manifest_uri,
    })
}
