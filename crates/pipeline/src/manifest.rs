//! Input manifest construction.

use labelchain_cloud::blob::BlobStore;
use labelchain_core::manifest::{is_manifest_candidate, manifest_line, s3_uri, INPUT_MANIFEST_KEY};

use crate::error::PipelineError;

const MANIFEST_CONTENT_TYPE: &str = "application/x-ndjson";

/// A published manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestSummary {
    pub uri: String,
    pub entries: usize,
}

/// List every image in `bucket` and publish `input.manifest` next to them.
///
/// Keys are consumed one listing page at a time and turned into lines
/// immediately; only the manifest text itself is held in memory.
pub async fn build_manifest(
    blob: &dyn BlobStore,
    bucket: &str,
) -> Result<ManifestSummary, PipelineError> {
    let mut body = Vec::new();
    let mut entries = 0usize;
    let mut continuation = None;

    loop {
        let page = blob.list_page(bucket, "", continuation).await?;
        for key in page.keys.iter().filter(|k| is_manifest_candidate(k)) {
            body.extend_from_slice(manifest_line(bucket, key)?.as_bytes());
            entries += 1;
        }
        match page.next {
            Some(token) => continuation = Some(token),
            None => break,
        }
    }

    if entries == 0 {
        tracing::warn!(bucket, "Input manifest is empty; no images found");
    }

    blob.put(bucket, INPUT_MANIFEST_KEY, body, MANIFEST_CONTENT_TYPE).await?;

    let uri = s3_uri(bucket, INPUT_MANIFEST_KEY);
    tracing::info!(uri = %uri, entries, "Input manifest published");
    Ok(ManifestSummary { uri, entries })
}
