//! Drop-bucket image preprocessing.
//!
//! Every image in the drop bucket is cropped and republished into the
//! job-input bucket under the same key, then removed from the drop bucket.
//! Images are independent: one failure is logged and recorded, its source is
//! left in place for the next run, and the rest carry on.

use futures::stream::{self, StreamExt};
use labelchain_cloud::blob::BlobStore;
use labelchain_core::crop::{CropSpec, ImageAsset, ImageKind};

use crate::context::PipelineContext;
use crate::error::PipelineError;

/// One image that could not be moved. Its source remains in the drop bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFailure {
    pub key: String,
    pub error: String,
    /// False for input errors such as an undecodable file; re-running will
    /// not fix those.
    pub retryable: bool,
}

/// Outcome of one preprocessing run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PreprocessReport {
    /// Keys republished and removed from the drop bucket.
    pub processed: Vec<String>,
    pub failed: Vec<ImageFailure>,
    /// Keys left alone because they are not images.
    pub skipped: Vec<String>,
}

impl PreprocessReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Whether a re-run may move some of the failed images.
    pub fn has_retryable_failures(&self) -> bool {
        self.failed.iter().any(|f| f.retryable)
    }
}

/// Move one image from `drop_bucket` to `input_bucket`, cropping on the way.
///
/// The source is deleted only after the cropped copy is stored.
async fn process_image(
    blob: &dyn BlobStore,
    crop: &CropSpec,
    drop_bucket: &str,
    input_bucket: &str,
    key: &str,
) -> Result<(), PipelineError> {
    let raw = blob.get(drop_bucket, key).await?;
    let mut asset = ImageAsset::new(key, raw)?;
    let cropped = asset.crop(crop)?.to_vec();

    tracing::debug!(
        key,
        dimensions = ?asset.dimensions,
        cropped_bytes = cropped.len(),
        "Image cropped",
    );

    blob.put(input_bucket, key, cropped, asset.kind.content_type()).await?;
    blob.delete(drop_bucket, key).await?;
    Ok(())
}

/// Crop every image in the drop bucket into the job-input bucket.
///
/// Listing failures abort the run; per-image failures are collected in the
/// report.
pub async fn preprocess_drop(
    ctx: &PipelineContext,
) -> Result<PreprocessReport, PipelineError> {
    let drop_bucket = ctx.drop_bucket.as_str();
    let input_bucket = ctx.input_bucket();
    let concurrency = ctx.preprocess_concurrency.max(1);
    let mut report = PreprocessReport::default();
    let mut continuation = None;

    tracing::info!(drop_bucket, input_bucket, concurrency, "Preprocessing drop images");

    loop {
        let page = ctx.blob.list_page(drop_bucket, "", continuation).await?;

        let (images, others): (Vec<String>, Vec<String>) = page
            .keys
            .into_iter()
            .filter(|k| !k.ends_with('/'))
            .partition(|k| ImageKind::from_key(k).is_ok());
        report.skipped.extend(others);

        let results: Vec<(String, Result<(), PipelineError>)> = stream::iter(images)
            .map(|key| async move {
                let result = process_image(
                    ctx.blob.as_ref(),
                    &ctx.crop,
                    drop_bucket,
                    input_bucket,
                    &key,
                )
                .await;
                (key, result)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        for (key, result) in results {
            match result {
                Ok(()) => {
                    tracing::info!(key = %key, "Processed image");
                    report.processed.push(key);
                }
                Err(e) => {
                    let retryable = e.is_retryable();
                    tracing::error!(
                        key = %key,
                        error = %e,
                        retryable,
                        "Failed to process image; source left in place",
                    );
                    report.failed.push(ImageFailure {
                        key,
                        error: e.to_string(),
                        retryable,
                    });
                }
            }
        }

        match page.next {
            Some(token) => continuation = Some(token),
            None => break,
        }
    }

    tracing::info!(
        processed = report.processed.len(),
        failed = report.failed.len(),
        skipped = report.skipped.len(),
        "Preprocessing finished",
    );
    Ok(report)
}
