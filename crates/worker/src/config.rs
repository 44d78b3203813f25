//! Worker configuration loaded from environment variables.

use std::sync::Arc;

use labelchain_cloud::backend::JobBackend;
use labelchain_cloud::blob::BlobStore;
use labelchain_core::idempotency::DEFAULT_TOKEN_WINDOW_SECS;
use labelchain_core::labeling_request::{
    LabelingProfile, TaskPrice, TaskType, Workforce, DEFAULT_LABEL_CLASSES,
};
use labelchain_pipeline::context::{PipelineContext, DEFAULT_PREPROCESS_CONCURRENCY};

const DEFAULT_TASK_TITLE: &str = "Image labeling job";
const DEFAULT_TASK_DESCRIPTION: &str = "Label the objects in each image";
const DEFAULT_TASK_KEYWORDS: &str = "image,segmentation";
const DEFAULT_LABEL_ATTRIBUTE_NAME: &str = "objects-ref";
const DEFAULT_ENVIRONMENT_TAG: &str = "development";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var} is invalid: {message}")]
    Invalid { var: &'static str, message: String },
}

/// Everything one worker invocation needs besides its AWS clients.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub profile: LabelingProfile,
    pub drop_bucket: String,
    pub label_classes: Vec<String>,
    pub preprocess_concurrency: usize,
    pub token_window_secs: u32,
}

impl WorkerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                   | Default                        |
    /// |---------------------------|--------------------------------|
    /// | `PROJECT_PREFIX`          | required                       |
    /// | `PROJECT_FRIENDLY_NAME`   | `PROJECT_PREFIX`               |
    /// | `AWS_REGION`              | required                       |
    /// | `DROP_BUCKET`             | required                       |
    /// | `JOB_INPUT_BUCKET`        | required                       |
    /// | `JOB_OUTPUT_BUCKET`       | required                       |
    /// | `INSTRUCTIONS_BUCKET`     | required                       |
    /// | `STREAMING_SNS_TOPIC_ARN` | unset (no streaming)           |
    /// | `GROUNDTRUTH_ROLE_ARN`    | required                       |
    /// | `PRIVATE_WORKTEAM_ARN`    | unset (public workforce)       |
    /// | `LABEL_CLASSES`           | built-in demo classes          |
    /// | `TASK_TYPE`               | `semantic-segmentation`        |
    /// | `USE_AUTO_LABELING`       | `false`                        |
    /// | `PREPROCESS_CONCURRENCY`  | `4`                            |
    /// | `TOKEN_WINDOW_SECS`       | `600`                          |
    /// | `ENVIRONMENT_TAG`         | `development`                  |
    /// | `LABEL_ATTRIBUTE_NAME`    | `objects-ref`                  |
    /// | `TASK_TITLE`              | `Image labeling job`           |
    /// | `TASK_DESCRIPTION`        | `Label the objects in each image` |
    /// | `TASK_KEYWORDS`           | `image,segmentation`           |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value
    /// if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let optional = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &'static str| optional(name).ok_or(ConfigError::Missing(name));

        let project_prefix = required("PROJECT_PREFIX")?;
        let project_friendly_name =
            optional("PROJECT_FRIENDLY_NAME").unwrap_or_else(|| project_prefix.clone());

        let task_type = match optional("TASK_TYPE") {
            Some(name) => TaskType::from_name(&name).map_err(|e| ConfigError::Invalid {
                var: "TASK_TYPE",
                message: e.to_string(),
            })?,
            None => TaskType::SemanticSegmentation,
        };

        let workforce = match optional("PRIVATE_WORKTEAM_ARN") {
            Some(workteam_arn) => Workforce::Private { workteam_arn },
            None => Workforce::Public {
                price: TaskPrice::default(),
            },
        };

        let label_classes = match optional("LABEL_CLASSES") {
            Some(raw) => split_list(&raw),
            None => DEFAULT_LABEL_CLASSES.iter().map(|s| s.to_string()).collect(),
        };
        if label_classes.is_empty() {
            return Err(ConfigError::Invalid {
                var: "LABEL_CLASSES",
                message: "at least one class is required".to_string(),
            });
        }

        let auto_labeling = match optional("USE_AUTO_LABELING") {
            Some(raw) => parse_bool("USE_AUTO_LABELING", &raw)?,
            None => false,
        };

        let preprocess_concurrency: usize = parse_or(
            "PREPROCESS_CONCURRENCY",
            optional("PREPROCESS_CONCURRENCY"),
            DEFAULT_PREPROCESS_CONCURRENCY,
        )?;
        if preprocess_concurrency == 0 {
            return Err(ConfigError::Invalid {
                var: "PREPROCESS_CONCURRENCY",
                message: "must be at least 1".to_string(),
            });
        }

        let token_window_secs: u32 = parse_or(
            "TOKEN_WINDOW_SECS",
            optional("TOKEN_WINDOW_SECS"),
            DEFAULT_TOKEN_WINDOW_SECS,
        )?;
        if token_window_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "TOKEN_WINDOW_SECS",
                message: "must be at least 1".to_string(),
            });
        }

        let profile = LabelingProfile {
            project_friendly_name,
            region: required("AWS_REGION")?,
            input_bucket: required("JOB_INPUT_BUCKET")?,
            output_bucket: required("JOB_OUTPUT_BUCKET")?,
            instructions_bucket: required("INSTRUCTIONS_BUCKET")?,
            streaming_sns_topic_arn: optional("STREAMING_SNS_TOPIC_ARN"),
            role_arn: required("GROUNDTRUTH_ROLE_ARN")?,
            workforce,
            task_type,
            label_attribute_name: optional("LABEL_ATTRIBUTE_NAME")
                .unwrap_or_else(|| DEFAULT_LABEL_ATTRIBUTE_NAME.to_string()),
            task_title: optional("TASK_TITLE").unwrap_or_else(|| DEFAULT_TASK_TITLE.to_string()),
            task_description: optional("TASK_DESCRIPTION")
                .unwrap_or_else(|| DEFAULT_TASK_DESCRIPTION.to_string()),
            task_keywords: split_list(
                &optional("TASK_KEYWORDS").unwrap_or_else(|| DEFAULT_TASK_KEYWORDS.to_string()),
            ),
            environment_tag: optional("ENVIRONMENT_TAG")
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT_TAG.to_string()),
            auto_labeling,
            project_prefix,
        };

        if profile.auto_labeling && profile.streaming_sns_topic_arn.is_some() {
            return Err(ConfigError::Invalid {
                var: "USE_AUTO_LABELING",
                message: "auto-labeling cannot be combined with STREAMING_SNS_TOPIC_ARN"
                    .to_string(),
            });
        }

        Ok(Self {
            profile,
            drop_bucket: required("DROP_BUCKET")?,
            label_classes,
            preprocess_concurrency,
            token_window_secs,
        })
    }

    /// Assemble the pipeline context around the given collaborators.
    pub fn into_context(
        self,
        blob: Arc<dyn BlobStore>,
        backend: Arc<dyn JobBackend>,
    ) -> PipelineContext {
        let mut ctx = PipelineContext::new(
            blob,
            backend,
            self.profile,
            self.drop_bucket,
            self.label_classes,
        );
        ctx.preprocess_concurrency = self.preprocess_concurrency;
        ctx.token_window_secs = self.token_window_secs;
        ctx
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(ConfigError::Invalid {
            var,
            message: format!("'{other}' is not a boolean"),
        }),
    }
}

fn parse_or<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}
