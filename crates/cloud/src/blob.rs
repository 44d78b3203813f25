//! Object storage seam.

use async_trait::async_trait;

use crate::error::CloudError;

/// One page of a key listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub keys: Vec<String>,
    /// Token for the next page; `None` on the last page.
    pub next: Option<String>,
}

/// Minimal object store operations used by the pipeline.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, CloudError>;

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), CloudError>;

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), CloudError>;

    /// List one page of keys under `prefix`, continuing from `continuation`.
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ListPage, CloudError>;

    /// Region the bucket lives in.
    async fn bucket_region(&self, bucket: &str) -> Result<String, CloudError>;
}
