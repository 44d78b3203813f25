/// Errors from the blob store and job backend adapters.
#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    /// A blob store read, delete or list call failed.
    #[error("Storage {operation} failed for s3://{bucket}/{key}: {message}")]
    Storage {
        operation: &'static str,
        bucket: String,
        key: String,
        message: String,
    },

    /// Writing an object did not succeed.
    #[error("Failed to upload s3://{bucket}/{key}: {message}")]
    UploadFailed {
        bucket: String,
        key: String,
        message: String,
    },

    /// The job backend call failed.
    #[error("Job backend {operation} failed: {message}")]
    Backend {
        operation: &'static str,
        message: String,
        retryable: bool,
    },

    /// The request was rejected as malformed, locally or by the backend.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A backend response lacked a field the chain depends on.
    #[error("{shape} response is missing {field}")]
    MissingField {
        shape: &'static str,
        field: &'static str,
    },

    /// The backend reported a job status this system does not know.
    #[error("Unknown labeling job status '{0}'")]
    UnknownStatus(String),
}

impl CloudError {
    /// Whether re-running the whole invocation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Storage { .. } | Self::UploadFailed { .. } => true,
            Self::Backend { retryable, .. } => *retryable,
            Self::InvalidRequest(_) | Self::MissingField { .. } | Self::UnknownStatus(_) => false,
        }
    }
}
