//! Labeling job creation requests.
//!
//! Builds the complete, validated request for a new job in the chain from
//! the project's [`LabelingProfile`] and a resolved [`ChainDecision`].
//! Submission itself happens in the job backend adapter.

use serde::Serialize;

use crate::chain::ChainDecision;
use crate::error::CoreError;
use crate::manifest::{parse_s3_uri, s3_uri};
use crate::naming::validate_job_name;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Object key of the label taxonomy in the job-input bucket.
pub const CLASS_LABELS_KEY: &str = "class_labels.json";

/// Object key of the worker UI template in the instructions bucket.
pub const UI_TEMPLATE_KEY: &str = "instructions.template";

/// Maximum number of data objects handed to the workforce at once.
pub const MAX_CONCURRENT_TASK_COUNT: u32 = 1000;

/// Workers that label each data object.
pub const WORKERS_PER_DATA_OBJECT: u32 = 1;

/// How long pending tasks stay available to the workforce (10 days).
pub const TASK_AVAILABILITY_LIFETIME_SECS: u32 = 864_000;

/// Time a worker has to finish a single task (10 minutes).
pub const TASK_TIME_LIMIT_SECS: u32 = 600;

/// Account hosting the public crowd workteam in every region.
const PUBLIC_CROWD_ACCOUNT: &str = "394669845002";

/// Accounts hosting the built-in pre-annotation and consolidation lambdas.
const ANNOTATION_LAMBDA_ACCOUNTS: &[(&str, &str)] = &[
    ("us-west-2", "081040173940"),
    ("us-east-1", "432418664414"),
    ("us-east-2", "266458841044"),
    ("eu-west-1", "568282634449"),
    ("ap-northeast-1", "477331159723"),
    ("ap-southeast-2", "454466003867"),
];

/// Account publishing the built-in auto-labeling algorithms.
const AUTO_LABELING_ACCOUNT: &str = "027400017018";

/// Default label classes when none are configured.
pub const DEFAULT_LABEL_CLASSES: &[&str] =
    &["fruit", "cheetah", "musical-instrument", "tiger", "snowman"];

// ---------------------------------------------------------------------------
// Task type
// ---------------------------------------------------------------------------

/// Built-in labeling task templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    SemanticSegmentation,
    ImageMultiClass,
}

impl TaskType {
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "semantic-segmentation" => Ok(Self::SemanticSegmentation),
            "image-multi-class" => Ok(Self::ImageMultiClass),
            other => Err(CoreError::Validation(format!(
                "Unknown task type '{other}'. \
                 Must be one of: semantic-segmentation, image-multi-class"
            ))),
        }
    }

    fn lambda_suffix(self) -> &'static str {
        match self {
            Self::SemanticSegmentation => "SemanticSegmentation",
            Self::ImageMultiClass => "ImageMultiClass",
        }
    }

    fn algorithm(self) -> &'static str {
        match self {
            Self::SemanticSegmentation => "semantic-segmentation",
            Self::ImageMultiClass => "image-classification",
        }
    }

    /// Pre-annotation lambda for `region`.
    pub fn pre_human_lambda_arn(self, region: &str) -> Result<String, CoreError> {
        let account = annotation_account(region)?;
        Ok(format!(
            "arn:aws:lambda:{region}:{account}:function:PRE-{}",
            self.lambda_suffix()
        ))
    }

    /// Annotation consolidation lambda for `region`.
    pub fn consolidation_lambda_arn(self, region: &str) -> Result<String, CoreError> {
        let account = annotation_account(region)?;
        Ok(format!(
            "arn:aws:lambda:{region}:{account}:function:ACS-{}",
            self.lambda_suffix()
        ))
    }

    /// Auto-labeling algorithm specification for `region`.
    pub fn algorithm_specification_arn(self, region: &str) -> String {
        format!(
            "arn:aws:sagemaker:{region}:{AUTO_LABELING_ACCOUNT}:\
             labeling-job-algorithm-specification/{}",
            self.algorithm()
        )
    }
}

fn annotation_account(region: &str) -> Result<&'static str, CoreError> {
    ANNOTATION_LAMBDA_ACCOUNTS
        .iter()
        .find(|(r, _)| *r == region)
        .map(|(_, account)| *account)
        .ok_or_else(|| {
            CoreError::Validation(format!(
                "Region '{region}' has no built-in annotation lambdas"
            ))
        })
}

// ---------------------------------------------------------------------------
// Workforce
// ---------------------------------------------------------------------------

/// Per-task payment for the public crowd, in USD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskPrice {
    pub dollars: u32,
    pub cents: u32,
    pub tenth_fractions_of_a_cent: u32,
}

impl Default for TaskPrice {
    /// 1.2 cents per task.
    fn default() -> Self {
        Self {
            dollars: 0,
            cents: 1,
            tenth_fractions_of_a_cent: 2,
        }
    }
}

/// Who labels the data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Workforce {
    Private { workteam_arn: String },
    Public { price: TaskPrice },
}

impl Workforce {
    /// Workteam ARN to route tasks to.
    pub fn workteam_arn(&self, region: &str) -> String {
        match self {
            Self::Private { workteam_arn } => workteam_arn.clone(),
            Self::Public { .. } => format!(
                "arn:aws:sagemaker:{region}:{PUBLIC_CROWD_ACCOUNT}:workteam/public-crowd/default"
            ),
        }
    }

    pub fn public_price(&self) -> Option<TaskPrice> {
        match self {
            Self::Private { .. } => None,
            Self::Public { price } => Some(*price),
        }
    }
}

// ---------------------------------------------------------------------------
// Label taxonomy
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct LabelEntry<'a> {
    label: &'a str,
}

#[derive(Debug, Serialize)]
struct LabelCategoryFile<'a> {
    labels: Vec<LabelEntry<'a>>,
}

/// Render the label category file: `{"labels":[{"label":"..."},...]}`.
pub fn label_category_json(classes: &[String]) -> Result<Vec<u8>, CoreError> {
    if classes.is_empty() {
        return Err(CoreError::Validation(
            "At least one label class is required".to_string(),
        ));
    }
    let file = LabelCategoryFile {
        labels: classes.iter().map(|c| LabelEntry { label: c }).collect(),
    };
    serde_json::to_vec(&file).map_err(|e| CoreError::Validation(e.to_string()))
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Backend content classifiers declared for the input data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentClassifier {
    FreeOfPersonallyIdentifiableInformation,
    FreeOfAdultContent,
}

/// Resource tag attached to a created job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTag {
    pub key: String,
    pub value: String,
}

/// Static project settings that every job in the chain shares.
#[derive(Debug, Clone)]
pub struct LabelingProfile {
    pub project_prefix: String,
    pub project_friendly_name: String,
    pub region: String,
    pub input_bucket: String,
    pub output_bucket: String,
    pub instructions_bucket: String,
    /// Topic feeding new objects into a streaming job.
    pub streaming_sns_topic_arn: Option<String>,
    pub role_arn: String,
    pub workforce: Workforce,
    pub task_type: TaskType,
    pub label_attribute_name: String,
    pub task_title: String,
    pub task_description: String,
    pub task_keywords: Vec<String>,
    pub environment_tag: String,
    pub auto_labeling: bool,
}

/// Human task parameters of a labeling job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HumanTaskConfig {
    pub workteam_arn: String,
    pub public_price: Option<TaskPrice>,
    pub ui_template_uri: String,
    pub pre_human_lambda_arn: String,
    pub consolidation_lambda_arn: String,
    pub max_concurrent_task_count: u32,
    pub workers_per_data_object: u32,
    pub task_availability_lifetime_secs: u32,
    pub task_time_limit_secs: u32,
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
}

/// A fully-formed labeling job creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelingJobRequest {
    pub job_name: String,
    pub manifest_uri: String,
    pub sns_topic_arn: Option<String>,
    pub content_classifiers: Vec<ContentClassifier>,
    pub output_path: String,
    pub role_arn: String,
    pub label_attribute_name: String,
    pub label_category_uri: String,
    pub human_task: HumanTaskConfig,
    pub algorithm_specification_arn: Option<String>,
    pub tags: Vec<JobTag>,
}

impl LabelingJobRequest {
    /// Build and validate the request for `decision`.
    ///
    /// Fails for [`crate::chain::ChainAction::NoAction`], which creates
    /// nothing.
    pub fn build(profile: &LabelingProfile, decision: &ChainDecision) -> Result<Self, CoreError> {
        let (Some(job_name), Some(manifest_uri)) =
            (&decision.new_job_name, &decision.manifest_uri)
        else {
            return Err(CoreError::Validation(format!(
                "Chain action {} does not create a labeling job",
                decision.action.as_str()
            )));
        };

        let region = profile.region.as_str();
        let human_task = HumanTaskConfig {
            workteam_arn: profile.workforce.workteam_arn(region),
            public_price: profile.workforce.public_price(),
            ui_template_uri: s3_uri(&profile.instructions_bucket, UI_TEMPLATE_KEY),
            pre_human_lambda_arn: profile.task_type.pre_human_lambda_arn(region)?,
            consolidation_lambda_arn: profile.task_type.consolidation_lambda_arn(region)?,
            max_concurrent_task_count: MAX_CONCURRENT_TASK_COUNT,
            workers_per_data_object: WORKERS_PER_DATA_OBJECT,
            task_availability_lifetime_secs: TASK_AVAILABILITY_LIFETIME_SECS,
            task_time_limit_secs: TASK_TIME_LIMIT_SECS,
            title: profile.task_title.clone(),
            description: profile.task_description.clone(),
            keywords: profile.task_keywords.clone(),
        };

        let tags = vec![
            JobTag { key: "Project".to_string(), value: profile.project_friendly_name.clone() },
            JobTag { key: "Purpose".to_string(), value: "GroundTruth Image labeling".to_string() },
            JobTag { key: "Environment".to_string(), value: profile.environment_tag.clone() },
        ];

        let request = Self {
            job_name: job_name.clone(),
            manifest_uri: manifest_uri.clone(),
            sns_topic_arn: profile.streaming_sns_topic_arn.clone(),
            content_classifiers: vec![
                ContentClassifier::FreeOfPersonallyIdentifiableInformation,
                ContentClassifier::FreeOfAdultContent,
            ],
            output_path: format!("s3://{}", profile.output_bucket),
            role_arn: profile.role_arn.clone(),
            label_attribute_name: profile.label_attribute_name.clone(),
            label_category_uri: s3_uri(&profile.input_bucket, CLASS_LABELS_KEY),
            human_task,
            algorithm_specification_arn: profile
                .auto_labeling
                .then(|| profile.task_type.algorithm_specification_arn(region)),
            tags,
        };

        request.validate()?;
        Ok(request)
    }

    /// Check the request against the backend's documented constraints.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_job_name(&self.job_name)?;

        for (field, uri) in [
            ("manifest URI", &self.manifest_uri),
            ("output path", &self.output_path),
            ("label category URI", &self.label_category_uri),
            ("UI template URI", &self.human_task.ui_template_uri),
        ] {
            if parse_s3_uri(uri).is_none() {
                return Err(CoreError::Validation(format!(
                    "{field} '{uri}' is not an s3:// URI"
                )));
            }
        }

        if self.role_arn.trim().is_empty() {
            return Err(CoreError::Validation("Role ARN must not be empty".to_string()));
        }
        if self.human_task.workteam_arn.trim().is_empty() {
            return Err(CoreError::Validation("Workteam ARN must not be empty".to_string()));
        }
        if self.label_attribute_name.trim().is_empty() {
            return Err(CoreError::Validation(
                "Label attribute name must not be empty".to_string(),
            ));
        }
        if self.algorithm_specification_arn.is_some() && self.sns_topic_arn.is_some() {
            return Err(CoreError::Validation(
                "Auto-labeling is not supported for streaming labeling jobs".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::plan_chain;
    use crate::job::{JobStatus, JobSummary, LabelCounters};
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    fn profile() -> LabelingProfile {
        LabelingProfile {
            project_prefix: "froth".to_string(),
            project_friendly_name: "Froth Anomaly Detection".to_string(),
            region: "ap-southeast-2".to_string(),
            input_bucket: "froth-job-input".to_string(),
            output_bucket: "froth-job-output".to_string(),
            instructions_bucket: "froth-instructions".to_string(),
            streaming_sns_topic_arn: Some(
                "arn:aws:sns:ap-southeast-2:123456789012:froth-stream".to_string(),
            ),
            role_arn: "arn:aws:iam::123456789012:role/groundtruth".to_string(),
            workforce: Workforce::Private {
                workteam_arn:
                    "arn:aws:sagemaker:ap-southeast-2:123456789012:workteam/private-crowd/froth"
                        .to_string(),
            },
            task_type: TaskType::SemanticSegmentation,
            label_attribute_name: "objects-ref".to_string(),
            task_title: "Froth labeling job".to_string(),
            task_description: "Outline froth anomalies".to_string(),
            task_keywords: vec!["image".to_string(), "segmentation".to_string()],
            environment_tag: "POC".to_string(),
            auto_labeling: false,
        }
    }

    fn fresh_decision() -> ChainDecision {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 45, 0).unwrap();
        plan_chain(&[], "froth", "froth-job-input", now).unwrap()
    }

    #[test]
    fn builds_request_for_new_job() {
        let req = LabelingJobRequest::build(&profile(), &fresh_decision()).unwrap();

        assert_eq!(req.job_name, "froth-202406010945");
        assert_eq!(req.manifest_uri, "s3://froth-job-input/input.manifest");
        assert_eq!(req.output_path, "s3://froth-job-output");
        assert_eq!(req.label_category_uri, "s3://froth-job-input/class_labels.json");
        assert_eq!(req.human_task.ui_template_uri, "s3://froth-instructions/instructions.template");
        assert_eq!(
            req.human_task.pre_human_lambda_arn,
            "arn:aws:lambda:ap-southeast-2:454466003867:function:PRE-SemanticSegmentation"
        );
        assert_eq!(
            req.human_task.consolidation_lambda_arn,
            "arn:aws:lambda:ap-southeast-2:454466003867:function:ACS-SemanticSegmentation"
        );
        assert_eq!(req.human_task.max_concurrent_task_count, 1000);
        assert_eq!(req.human_task.workers_per_data_object, 1);
        assert_eq!(req.human_task.task_availability_lifetime_secs, 864_000);
        assert_eq!(req.human_task.task_time_limit_secs, 600);
        assert!(req.human_task.public_price.is_none());
        assert!(req.algorithm_specification_arn.is_none());
        assert_eq!(req.tags.len(), 3);
        assert_eq!(req.tags[0].value, "Froth Anomaly Detection");
    }

    #[test]
    fn chained_request_reuses_source_output() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 45, 0).unwrap();
        let source = JobSummary {
            name: "froth-202405010000".to_string(),
            arn: "arn:job".to_string(),
            status: JobStatus::Completed,
            creation_time: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            output_manifest_uri: Some(
                "s3://froth-job-output/froth-202405010000/manifests/output/output.manifest"
                    .to_string(),
            ),
            workteam_arn: "arn:team".to_string(),
            label_counters: LabelCounters {
                total_labeled: 1,
                unlabeled: 5,
                failed_non_retryable: 0,
            },
        };
        let decision = plan_chain(&[source.clone()], "froth", "froth-job-input", now).unwrap();
        let req = LabelingJobRequest::build(&profile(), &decision).unwrap();

        assert_eq!(req.job_name, "froth-202406010945-chained-from-202405010000");
        assert_eq!(Some(req.manifest_uri), source.output_manifest_uri);
    }

    #[test]
    fn public_workforce_uses_crowd_team_and_price() {
        let mut p = profile();
        p.workforce = Workforce::Public { price: TaskPrice::default() };
        let req = LabelingJobRequest::build(&p, &fresh_decision()).unwrap();

        assert_eq!(
            req.human_task.workteam_arn,
            "arn:aws:sagemaker:ap-southeast-2:394669845002:workteam/public-crowd/default"
        );
        assert_eq!(
            req.human_task.public_price,
            Some(TaskPrice {
                dollars: 0,
                cents: 1,
                tenth_fractions_of_a_cent: 2,
            })
        );
    }

    #[test]
    fn no_action_cannot_be_built() {
        let decision = ChainDecision {
            action: crate::chain::ChainAction::NoAction,
            new_job_name: None,
            manifest_uri: None,
        };
        assert_matches!(
            LabelingJobRequest::build(&profile(), &decision),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn unsupported_region_is_rejected() {
        let mut p = profile();
        p.region = "sa-east-1".to_string();
        assert!(LabelingJobRequest::build(&p, &fresh_decision()).is_err());
    }

    #[test]
    fn auto_labeling_conflicts_with_streaming() {
        let mut p = profile();
        p.auto_labeling = true;
        assert!(LabelingJobRequest::build(&p, &fresh_decision()).is_err());

        p.streaming_sns_topic_arn = None;
        let req = LabelingJobRequest::build(&p, &fresh_decision()).unwrap();
        assert_eq!(
            req.algorithm_specification_arn.as_deref(),
            Some(
                "arn:aws:sagemaker:ap-southeast-2:027400017018:\
                 labeling-job-algorithm-specification/semantic-segmentation"
            )
        );
    }

    #[test]
    fn non_s3_manifest_is_rejected() {
        let mut decision = fresh_decision();
        decision.manifest_uri = Some("https://example.com/input.manifest".to_string());
        assert!(LabelingJobRequest::build(&profile(), &decision).is_err());
    }

    #[test]
    fn label_category_file_shape() {
        let classes = vec!["froth".to_string(), "bubble".to_string()];
        let json = label_category_json(&classes).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(
            parsed,
            serde_json::json!({ "labels": [{ "label": "froth" }, { "label": "bubble" }] })
        );
        assert!(label_category_json(&[]).is_err());
    }

    #[test]
    fn task_type_from_name() {
        assert_eq!(
            TaskType::from_name("semantic-segmentation").unwrap(),
            TaskType::SemanticSegmentation
        );
        assert_eq!(TaskType::from_name("image-multi-class").unwrap(), TaskType::ImageMultiClass);
        assert!(TaskType::from_name("video").is_err());
    }
}
