//! Labeling job and pipeline execution naming conventions.
//!
//! Names embed minute-resolution timestamps so the chain lineage can be read
//! straight from the job list. Two jobs created in the same minute collide;
//! the backend rejects the second one.

use std::sync::LazyLock;

use chrono::{Datelike, Timelike};
use regex::Regex;

use crate::error::CoreError;
use crate::types::Timestamp;

/// Maximum length the backend accepts for a labeling job name.
pub const MAX_JOB_NAME_LEN: usize = 63;

/// Alphanumeric segments joined by hyphens, starting and ending alphanumeric.
static JOB_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9](-*[a-zA-Z0-9])*$").expect("valid regex"));

fn minute_stamp(ts: Timestamp) -> String {
    format!(
        "{}{:02}{:02}{:02}{:02}",
        ts.year(),
        ts.month(),
        ts.day(),
        ts.hour(),
        ts.minute()
    )
}

/// Name for the first job of a chain: `{prefix}-{yyyyMMddHHmm}`.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use labelchain_core::naming::new_job_name;
///
/// let now = Utc.with_ymd_and_hms(2024, 3, 4, 5, 6, 7).unwrap();
/// assert_eq!(new_job_name("froth", now), "froth-202403040506");
/// ```
pub fn new_job_name(project_prefix: &str, now: Timestamp) -> String {
    format!("{project_prefix}-{}", minute_stamp(now))
}

/// Name for a job chained from a prior one:
/// `{prefix}-{yyyyMMddHHmm}-chained-from-{source yyyyMMddHHmm}`.
pub fn chained_job_name(project_prefix: &str, now: Timestamp, source_created: Timestamp) -> String {
    format!(
        "{project_prefix}-{}-chained-from-{}",
        minute_stamp(now),
        minute_stamp(source_created)
    )
}

/// Display name for a pipeline execution.
///
/// Month and day are zero-padded; hour, minute and second are not. Existing
/// dashboards sort on this exact shape.
pub fn pipeline_execution_display_name(project_prefix: &str, now: Timestamp) -> String {
    format!(
        "{project_prefix}-{}{:02}{:02}{}{}{}",
        now.year(),
        now.month(),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}

/// Name of the backend pipeline that a trigger starts.
pub fn pipeline_name(project_prefix: &str) -> String {
    format!("{project_prefix}-groundtruth-pipeline")
}

/// Validate a labeling job name against the backend's constraints.
pub fn validate_job_name(name: &str) -> Result<(), CoreError> {
    if name.is_empty() {
        return Err(CoreError::Validation(
            "Labeling job name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_JOB_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Labeling job name '{name}' exceeds {MAX_JOB_NAME_LEN} characters"
        )));
    }
    if !JOB_NAME_RE.is_match(name) {
        return Err(CoreError::Validation(format!(
            "Labeling job name '{name}' may only contain alphanumerics and inner hyphens"
        )));
    }
    Ok(())
}
