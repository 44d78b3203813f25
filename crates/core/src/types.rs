/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Default number of most-recent jobs inspected per project.
pub const JOB_HISTORY_LIMIT: usize = 10;
