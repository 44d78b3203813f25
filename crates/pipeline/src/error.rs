use labelchain_cloud::error::CloudError;
use labelchain_core::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Cloud(#[from] CloudError),

    #[error("Manifest serialization failed: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Whether re-running the whole invocation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Cloud(e) => e.is_retryable(),
            Self::Core(_) | Self::Manifest(_) | Self::Config(_) => false,
        }
    }

    /// A chain precondition an operator has to resolve by waiting.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Core(CoreError::Precondition(_)))
    }
}
