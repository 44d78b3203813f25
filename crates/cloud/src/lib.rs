//! Cloud collaborators for the labeling chain.
//!
//! Defines the [`BlobStore`](blob::BlobStore) and
//! [`JobBackend`](backend::JobBackend) seams the pipeline talks to, and their
//! AWS implementations over S3 and SageMaker.

pub mod backend;
pub mod blob;
pub mod error;
pub mod s3;
pub mod sagemaker;

/// Load the shared AWS SDK configuration for `region`.
///
/// Credentials and endpoint overrides come from the standard AWS
/// environment/profile chain.
pub async fn load_sdk_config(region: &str) -> aws_config::SdkConfig {
    aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()))
        .load()
        .await
}
