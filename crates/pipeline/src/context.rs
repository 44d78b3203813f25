//! Per-invocation context shared by every step.

use std::sync::Arc;

use labelchain_cloud::backend::JobBackend;
use labelchain_cloud::blob::BlobStore;
use labelchain_core::crop::CropSpec;
use labelchain_core::idempotency::DEFAULT_TOKEN_WINDOW_SECS;
use labelchain_core::labeling_request::LabelingProfile;
use labelchain_core::types::JOB_HISTORY_LIMIT;

/// Default number of images cropped concurrently.
pub const DEFAULT_PREPROCESS_CONCURRENCY: usize = 4;

/// Collaborators and settings for one invocation.
///
/// Built explicitly at startup and passed to each step; steps hold no state
/// of their own between invocations.
#[derive(Clone)]
pub struct PipelineContext {
    pub blob: Arc<dyn BlobStore>,
    pub backend: Arc<dyn JobBackend>,
    pub profile: LabelingProfile,
    /// Bucket where raw images land.
    pub drop_bucket: String,
    pub label_classes: Vec<String>,
    pub crop: CropSpec,
    pub preprocess_concurrency: usize,
    pub token_window_secs: u32,
    pub job_history_limit: usize,
}

impl PipelineContext {
    /// Context with default tuning for everything but the collaborators and
    /// project settings.
    pub fn new(
        blob: Arc<dyn BlobStore>,
        backend: Arc<dyn JobBackend>,
        profile: LabelingProfile,
        drop_bucket: String,
        label_classes: Vec<String>,
    ) -> Self {
        Self {
            blob,
            backend,
            profile,
            drop_bucket,
            label_classes,
            crop: CropSpec::default(),
            preprocess_concurrency: DEFAULT_PREPROCESS_CONCURRENCY,
            token_window_secs: DEFAULT_TOKEN_WINDOW_SECS,
            job_history_limit: JOB_HISTORY_LIMIT,
        }
    }

    pub fn project_prefix(&self) -> &str {
        &self.profile.project_prefix
    }

    pub fn input_bucket(&self) -> &str {
        &self.profile.input_bucket
    }
}
