//! SageMaker implementation of [`JobBackend`].
//!
//! Labeling jobs map onto SageMaker Ground Truth; trigger runs start a
//! SageMaker pipeline execution.

use async_trait::async_trait;
use aws_sdk_sagemaker::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_sagemaker::types::{
    AnnotationConsolidationConfig, ContentClassifier as SdkContentClassifier, HumanTaskConfig,
    LabelingJobAlgorithmsConfig, LabelingJobDataAttributes, LabelingJobDataSource,
    LabelingJobInputConfig, LabelingJobOutputConfig, LabelingJobS3DataSource,
    LabelingJobSnsDataSource, LabelingJobStatus, LabelingJobSummary, PublicWorkforceTaskPrice,
    SortBy, SortOrder, Tag, UiConfig, Usd,
};
use aws_sdk_sagemaker::Client as SageMakerClient;
use aws_smithy_types::DateTime as SmithyDateTime;
use labelchain_core::job::{JobStatus, JobSummary, LabelCounters};
use labelchain_core::labeling_request::{ContentClassifier, LabelingJobRequest, TaskPrice};
use labelchain_core::trigger::PipelineExecutionRequest;
use labelchain_core::types::Timestamp;

use crate::backend::JobBackend;
use crate::error::CloudError;

/// Error code SageMaker uses for malformed requests.
const VALIDATION_EXCEPTION: &str = "ValidationException";

const SUMMARY_SHAPE: &str = "LabelingJobSummary";

/// Job backend backed by the SageMaker API.
#[derive(Clone)]
pub struct SageMakerBackend {
    client: SageMakerClient,
}

impl SageMakerBackend {
    pub fn new(client: SageMakerClient) -> Self {
        Self { client }
    }

    pub fn from_sdk_config(config: &aws_config::SdkConfig) -> Self {
        Self::new(SageMakerClient::new(config))
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Map SDK errors: malformed requests are fatal, everything else retryable.
fn map_sdk_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> CloudError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let fatal = match &err {
        SdkError::ConstructionFailure(_) => true,
        SdkError::ServiceError(service) => service.err().code() == Some(VALIDATION_EXCEPTION),
        _ => false,
    };
    let message = DisplayErrorContext(&err).to_string();

    if fatal {
        CloudError::InvalidRequest(format!("{operation}: {message}"))
    } else {
        CloudError::Backend {
            operation,
            message,
            retryable: true,
        }
    }
}

fn missing(shape: &'static str, field: &'static str) -> CloudError {
    CloudError::MissingField { shape, field }
}

// ---------------------------------------------------------------------------
// Response conversion
// ---------------------------------------------------------------------------

fn map_status(status: &LabelingJobStatus) -> Result<JobStatus, CloudError> {
    match status {
        // A job still initializing already owns the chain.
        LabelingJobStatus::Initializing | LabelingJobStatus::InProgress => {
            Ok(JobStatus::InProgress)
        }
        LabelingJobStatus::Completed => Ok(JobStatus::Completed),
        LabelingJobStatus::Stopped => Ok(JobStatus::Stopped),
        LabelingJobStatus::Stopping => Ok(JobStatus::Stopping),
        LabelingJobStatus::Failed => Ok(JobStatus::Failed),
        other => Err(CloudError::UnknownStatus(other.as_str().to_string())),
    }
}

fn count(value: Option<i32>) -> u32 {
    value.map_or(0, |v| u32::try_from(v).unwrap_or(0))
}

fn to_timestamp(dt: &SmithyDateTime) -> Option<Timestamp> {
    chrono::DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

/// Convert one listed job.
///
/// Name, ARN, status and creation time drive the chain decision, so a
/// response without them is rejected. Missing counters read as zero and a
/// missing workteam as empty.
fn summary_from_sdk(job: &LabelingJobSummary) -> Result<JobSummary, CloudError> {
    let name = job
        .labeling_job_name()
        .ok_or_else(|| missing(SUMMARY_SHAPE, "LabelingJobName"))?;
    let arn = job
        .labeling_job_arn()
        .ok_or_else(|| missing(SUMMARY_SHAPE, "LabelingJobArn"))?;
    let status = job
        .labeling_job_status()
        .ok_or_else(|| missing(SUMMARY_SHAPE, "LabelingJobStatus"))?;
    let created = job
        .creation_time()
        .ok_or_else(|| missing(SUMMARY_SHAPE, "CreationTime"))?;
    let creation_time = to_timestamp(created).ok_or_else(|| {
        CloudError::InvalidRequest(format!(
            "Labeling job '{name}' has an out-of-range creation time"
        ))
    })?;

    let label_counters = job
        .label_counters()
        .map(|c| LabelCounters {
            total_labeled: count(c.total_labeled()),
            unlabeled: count(c.unlabeled()),
            failed_non_retryable: count(c.failed_non_retryable_error()),
        })
        .unwrap_or_default();

    Ok(JobSummary {
        name: name.to_string(),
        arn: arn.to_string(),
        status: map_status(status)?,
        creation_time,
        output_manifest_uri: job
            .labeling_job_output()
            .and_then(|o| o.output_dataset_s3_uri())
            .map(str::to_string),
        workteam_arn: job.workteam_arn().unwrap_or_default().to_string(),
        label_counters,
    })
}

// ---------------------------------------------------------------------------
// Request conversion
// ---------------------------------------------------------------------------

fn content_classifier(c: ContentClassifier) -> SdkContentClassifier {
    match c {
        ContentClassifier::FreeOfPersonallyIdentifiableInformation => {
            SdkContentClassifier::FreeOfPersonallyIdentifiableInformation
        }
        ContentClassifier::FreeOfAdultContent => SdkContentClassifier::FreeOfAdultContent,
    }
}

fn public_price(price: TaskPrice) -> PublicWorkforceTaskPrice {
    PublicWorkforceTaskPrice::builder()
        .amount_in_usd(
            Usd::builder()
                .dollars(price.dollars as i32)
                .cents(price.cents as i32)
                .tenth_fractions_of_a_cent(price.tenth_fractions_of_a_cent as i32)
                .build(),
        )
        .build()
}

fn input_config(request: &LabelingJobRequest) -> LabelingJobInputConfig {
    let mut source = LabelingJobDataSource::builder().s3_data_source(
        LabelingJobS3DataSource::builder()
            .manifest_s3_uri(&request.manifest_uri)
            .build(),
    );
    if let Some(topic) = &request.sns_topic_arn {
        source = source.sns_data_source(
            LabelingJobSnsDataSource::builder()
                .sns_topic_arn(topic)
                .build(),
        );
    }

    let attributes = LabelingJobDataAttributes::builder()
        .set_content_classifiers(Some(
            request
                .content_classifiers
                .iter()
                .copied()
                .map(content_classifier)
                .collect(),
        ))
        .build();

    LabelingJobInputConfig::builder()
        .data_source(source.build())
        .data_attributes(attributes)
        .build()
}

fn human_task_config(request: &LabelingJobRequest) -> HumanTaskConfig {
    let task = &request.human_task;
    let mut builder = HumanTaskConfig::builder()
        .workteam_arn(&task.workteam_arn)
        .ui_config(UiConfig::builder().ui_template_s3_uri(&task.ui_template_uri).build())
        .pre_human_task_lambda_arn(&task.pre_human_lambda_arn)
        .annotation_consolidation_config(
            AnnotationConsolidationConfig::builder()
                .annotation_consolidation_lambda_arn(&task.consolidation_lambda_arn)
                .build(),
        )
        .max_concurrent_task_count(task.max_concurrent_task_count as i32)
        .number_of_human_workers_per_data_object(task.workers_per_data_object as i32)
        .task_availability_lifetime_in_seconds(task.task_availability_lifetime_secs as i32)
        .task_time_limit_in_seconds(task.task_time_limit_secs as i32)
        .task_title(&task.title)
        .task_description(&task.description)
        .set_task_keywords(Some(task.keywords.clone()));

    if let Some(price) = task.public_price {
        builder = builder.public_workforce_task_price(public_price(price));
    }

    builder.build()
}

fn tags(request: &LabelingJobRequest) -> Vec<Tag> {
    request
        .tags
        .iter()
        .map(|t| Tag::builder().key(&t.key).value(&t.value).build())
        .collect()
}

// ---------------------------------------------------------------------------
// JobBackend
// ---------------------------------------------------------------------------

#[async_trait]
impl JobBackend for SageMakerBackend {
    async fn list_jobs(
        &self,
        name_prefix: &str,
        limit: usize,
    ) -> Result<Vec<JobSummary>, CloudError> {
        let output = self
            .client
            .list_labeling_jobs()
            .sort_by(SortBy::CreationTime)
            .sort_order(SortOrder::Descending)
            .name_contains(name_prefix)
            .max_results(i32::try_from(limit).unwrap_or(i32::MAX))
            .send()
            .await
            .map_err(|e| map_sdk_error("ListLabelingJobs", e))?;

        output
            .labeling_job_summary_list()
            .iter()
            .map(summary_from_sdk)
            .collect()
    }

    async fn create_labeling_job(
        &self,
        request: &LabelingJobRequest,
    ) -> Result<String, CloudError> {
        let mut call = self
            .client
            .create_labeling_job()
            .labeling_job_name(&request.job_name)
            .label_attribute_name(&request.label_attribute_name)
            .input_config(input_config(request))
            .output_config(
                LabelingJobOutputConfig::builder()
                    .s3_output_path(&request.output_path)
                    .build(),
            )
            .role_arn(&request.role_arn)
            .label_category_config_s3_uri(&request.label_category_uri)
            .human_task_config(human_task_config(request))
            .set_tags(Some(tags(request)));

        if let Some(spec) = &request.algorithm_specification_arn {
            call = call.labeling_job_algorithms_config(
                LabelingJobAlgorithmsConfig::builder()
                    .labeling_job_algorithm_specification_arn(spec)
                    .build(),
            );
        }

        let output = call
            .send()
            .await
            .map_err(|e| map_sdk_error("CreateLabelingJob", e))?;

        output
            .labeling_job_arn()
            .map(str::to_string)
            .ok_or_else(|| missing("CreateLabelingJob", "LabelingJobArn"))
    }

    async fn start_pipeline_execution(
        &self,
        request: &PipelineExecutionRequest,
    ) -> Result<String, CloudError> {
        let output = self
            .client
            .start_pipeline_execution()
            .pipeline_name(&request.pipeline_name)
            .pipeline_execution_display_name(&request.display_name)
            .pipeline_execution_description(&request.description)
            .client_request_token(&request.client_request_token)
            .send()
            .await
            .map_err(|e| map_sdk_error("StartPipelineExecution", e))?;

        output
            .pipeline_execution_arn()
            .map(str::to_string)
            .ok_or_else(|| missing("StartPipelineExecution", "PipelineExecutionArn"))
    }
}
