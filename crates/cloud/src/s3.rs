//! S3 implementation of [`BlobStore`].

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;

use crate::blob::{BlobStore, ListPage};
use crate::error::CloudError;

/// Blob store backed by the AWS S3 API.
#[derive(Clone)]
pub struct S3BlobStore {
    client: S3Client,
}

impl S3BlobStore {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }

    pub fn from_sdk_config(config: &aws_config::SdkConfig) -> Self {
        Self::new(S3Client::new(config))
    }
}

fn storage_error(
    operation: &'static str,
    bucket: &str,
    key: &str,
    err: impl std::error::Error,
) -> CloudError {
    CloudError::Storage {
        operation,
        bucket: bucket.to_string(),
        key: key.to_string(),
        message: DisplayErrorContext(err).to_string(),
    }
}

/// Map a `GetBucketLocation` constraint to a region name.
///
/// S3 reports `us-east-1` as an empty constraint and the original
/// `eu-west-1` as the legacy `EU` alias.
fn normalize_location(constraint: Option<&str>) -> String {
    match constraint {
        None | Some("") => "us-east-1".to_string(),
        Some("EU") => "eu-west-1".to_string(),
        Some(region) => region.to_string(),
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, CloudError> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| storage_error("get", bucket, key, e))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| storage_error("get", bucket, key, e))?
            .into_bytes()
            .to_vec();

        tracing::debug!(bucket, key, bytes = data.len(), "Fetched object");
        Ok(data)
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), CloudError> {
        let len = body.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| CloudError::UploadFailed {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: DisplayErrorContext(e).to_string(),
            })?;

        tracing::debug!(bucket, key, bytes = len, "Uploaded object");
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), CloudError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| storage_error("delete", bucket, key, e))?;
        Ok(())
    }

    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ListPage, CloudError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .set_continuation_token(continuation)
            .send()
            .await
            .map_err(|e| storage_error("list", bucket, prefix, e))?;

        let keys = output
            .contents()
            .iter()
            .filter_map(|obj| obj.key().map(str::to_string))
            .collect();

        Ok(ListPage {
            keys,
            next: output.next_continuation_token().map(str::to_string),
        })
    }

    async fn bucket_region(&self, bucket: &str) -> Result<String, CloudError> {
        let output = self
            .client
            .get_bucket_location()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| storage_error("locate", bucket, "", e))?;

        Ok(normalize_location(
            output.location_constraint().map(|c| c.as_str()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_constraint_normalization() {
        assert_eq!(normalize_location(None), "us-east-1");
        assert_eq!(normalize_location(Some("")), "us-east-1");
        assert_eq!(normalize_location(Some("EU")), "eu-west-1");
        assert_eq!(normalize_location(Some("ap-southeast-2")), "ap-southeast-2");
    }
}
