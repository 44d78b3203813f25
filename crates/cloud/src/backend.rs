//! Labeling job backend seam.

use async_trait::async_trait;
use labelchain_core::job::JobSummary;
use labelchain_core::labeling_request::LabelingJobRequest;
use labelchain_core::trigger::PipelineExecutionRequest;

use crate::error::CloudError;

/// Job-control operations of the labeling backend.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// The most recent `limit` jobs whose name contains `name_prefix`,
    /// newest first.
    async fn list_jobs(
        &self,
        name_prefix: &str,
        limit: usize,
    ) -> Result<Vec<JobSummary>, CloudError>;

    /// Submit a labeling job. Returns the new job's ARN.
    async fn create_labeling_job(&self, request: &LabelingJobRequest) -> Result<String, CloudError>;

    /// Start a pipeline execution. Returns the execution ARN.
    async fn start_pipeline_execution(
        &self,
        request: &PipelineExecutionRequest,
    ) -> Result<String, CloudError>;
}
