//! Clock-bucketed idempotency tokens.
//!
//! Trigger attempts that land in the same rounding window produce the same
//! token, and the backend collapses requests that carry an identical token.
//! No local dedup store is kept.

use chrono::{Duration, Timelike};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Window used for pipeline trigger tokens (10 minutes).
pub const DEFAULT_TOKEN_WINDOW_SECS: u32 = 600;

/// How a timestamp is snapped to a window boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundingMode {
    /// Ceiling to the next boundary.
    Up,
    /// Floor to the previous boundary.
    Down,
    /// Half-up to the closest boundary.
    #[default]
    Nearest,
}

/// Round `ts` to a multiple of `window_secs`, counted from midnight of the
/// same day.
///
/// A timestamp already sitting on a boundary (no sub-second part) is
/// returned as-is regardless of mode. The result never carries sub-second
/// precision.
pub fn round_time(
    ts: Timestamp,
    window_secs: u32,
    mode: RoundingMode,
) -> Result<Timestamp, CoreError> {
    if window_secs == 0 {
        return Err(CoreError::Validation(
            "Rounding window must be at least one second".to_string(),
        ));
    }

    let window = i64::from(window_secs);
    let secs = i64::from(ts.num_seconds_from_midnight());
    let has_fraction = ts.nanosecond() != 0;

    let rounded = if !has_fraction && secs % window == 0 {
        secs
    } else {
        match mode {
            RoundingMode::Up => (secs / window + 1) * window,
            RoundingMode::Down => secs / window * window,
            // (secs + window/2) floored, kept in integers for odd windows.
            RoundingMode::Nearest => (2 * secs + window) / (2 * window) * window,
        }
    };

    let truncated = ts
        .with_nanosecond(0)
        .ok_or_else(|| CoreError::Validation("Timestamp cannot be truncated".to_string()))?;
    Ok(truncated + Duration::seconds(rounded - secs))
}

/// Build the pipeline trigger token for `project_prefix` at `now`.
///
/// Format: `{prefix}-triggerpipeline-{YYYY-MM-DD HH:MM:SS}`, where the
/// timestamp is `now` rounded up to the next `window_secs` boundary.
pub fn idempotency_token(
    project_prefix: &str,
    now: Timestamp,
    window_secs: u32,
) -> Result<String, CoreError> {
    let rounded = round_time(now, window_secs, RoundingMode::Up)?;
    Ok(format!(
        "{project_prefix}-triggerpipeline-{}",
        rounded.format("%Y-%m-%d %H:%M:%S")
    ))
}
