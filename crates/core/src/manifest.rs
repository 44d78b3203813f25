//! Job-input manifest lines and object reference helpers.
//!
//! A manifest is UTF-8 text with one JSON object per line:
//! `{"source-ref": "s3://bucket/key"}`.

use serde::{Deserialize, Serialize};

use crate::crop::ImageKind;
use crate::error::CoreError;

/// Object key of the manifest built for fresh jobs.
pub const INPUT_MANIFEST_KEY: &str = "input.manifest";

/// One manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(rename = "source-ref")]
    pub source_ref: String,
}

/// `s3://{bucket}/{key}`.
pub fn s3_uri(bucket: &str, key: &str) -> String {
    format!("s3://{bucket}/{key}")
}

/// Split an `s3://bucket/key` URI into its bucket and key.
///
/// Returns `None` for other schemes or a missing bucket.
pub fn parse_s3_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("s3://")?;
    let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
    if bucket.is_empty() {
        return None;
    }
    Some((bucket, key))
}

/// Whether `key` names an image that belongs in a manifest.
pub fn is_manifest_candidate(key: &str) -> bool {
    !key.ends_with('/') && ImageKind::from_key(key).is_ok()
}

/// Render a single newline-terminated manifest line for `bucket`/`key`.
pub fn manifest_line(bucket: &str, key: &str) -> Result<String, serde_json::Error> {
    let entry = ManifestEntry {
        source_ref: s3_uri(bucket, key),
    };
    let mut line = serde_json::to_string(&entry)?;
    line.push('\n');
    Ok(line)
}

/// Parse manifest text back into its entries. Blank lines are ignored.
pub fn parse_manifest(text: &str) -> Result<Vec<ManifestEntry>, CoreError> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| {
                CoreError::Validation(format!("Manifest line {} is not valid: {e}", i + 1))
            })
        })
        .collect()
}
