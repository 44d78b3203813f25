//! Labeling job snapshots as reported by the job backend.
//!
//! These are read-only views. The chain resolver and the trigger classifier
//! only ever inspect them; nothing here is persisted locally.

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a labeling job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    InProgress,
    Completed,
    Stopped,
    Stopping,
    Failed,
}

impl JobStatus {
    /// Backend status string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "InProgress",
            Self::Completed => "Completed",
            Self::Stopped => "Stopped",
            Self::Stopping => "Stopping",
            Self::Failed => "Failed",
        }
    }

    /// Whether a job in this status may seed a chained job.
    pub fn is_chainable(self) -> bool {
        matches!(self, Self::Completed | Self::Stopped)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// JobSummary
// ---------------------------------------------------------------------------

/// Per-job label progress counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelCounters {
    pub total_labeled: u32,
    pub unlabeled: u32,
    pub failed_non_retryable: u32,
}

impl LabelCounters {
    /// True when some data objects were never labeled or failed permanently.
    pub fn has_remaining_work(&self) -> bool {
        self.unlabeled > 0 || self.failed_non_retryable > 0
    }
}

/// Snapshot of one labeling job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSummary {
    pub name: String,
    pub arn: String,
    pub status: JobStatus,
    pub creation_time: Timestamp,
    pub output_manifest_uri: Option<String>,
    pub workteam_arn: String,
    pub label_counters: LabelCounters,
}

impl JobSummary {
    /// A finished job that still left work behind.
    pub fn needs_chaining(&self) -> bool {
        self.status.is_chainable() && self.label_counters.has_remaining_work()
    }
}
