//! Shared fixtures for pipeline integration tests.
//!
//! In-memory stand-ins for the object store and the labeling backend, plus
//! builders for profiles, jobs and encoded test images.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use image::{DynamicImage, ImageFormat};

use labelchain_cloud::backend::JobBackend;
use labelchain_cloud::blob::{BlobStore, ListPage};
use labelchain_cloud::error::CloudError;
use labelchain_core::job::{JobStatus, JobSummary, LabelCounters};
use labelchain_core::labeling_request::{LabelingJobRequest, LabelingProfile, TaskType, Workforce};
use labelchain_core::trigger::PipelineExecutionRequest;
use labelchain_core::types::Timestamp;
use labelchain_pipeline::context::PipelineContext;

pub const REGION: &str = "ap-southeast-2";
pub const PREFIX: &str = "froth";
pub const DROP_BUCKET: &str = "froth-drop";
pub const INPUT_BUCKET: &str = "froth-job-input";
pub const OUTPUT_BUCKET: &str = "froth-job-output";

// ---------------------------------------------------------------------------
// MemoryBlobStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

/// Object store held in a sorted map.
///
/// Listing pages continue from the last key returned, like S3's
/// `start-after`, so deleting already-listed keys mid-listing is safe.
pub struct MemoryBlobStore {
    objects: Mutex<BTreeMap<(String, String), StoredObject>>,
    page_size: usize,
    region: String,
    failing_puts: Mutex<HashSet<String>>,
    failing_gets: Mutex<HashSet<String>>,
    list_calls: Mutex<usize>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::with_page_size(1000)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            page_size,
            region: REGION.to_string(),
            failing_puts: Mutex::new(HashSet::new()),
            failing_gets: Mutex::new(HashSet::new()),
            list_calls: Mutex::new(0),
        }
    }

    pub fn in_region(mut self, region: &str) -> Self {
        self.region = region.to_string();
        self
    }

    pub fn insert(&self, bucket: &str, key: &str, body: Vec<u8>) {
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body,
                content_type: "application/octet-stream".to_string(),
            },
        );
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    /// Make every `put` of `key` fail.
    pub fn fail_put(&self, key: &str) {
        self.failing_puts.lock().unwrap().insert(key.to_string());
    }

    /// Make every `get` of `key` fail.
    pub fn fail_get(&self, key: &str) {
        self.failing_gets.lock().unwrap().insert(key.to_string());
    }

    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, CloudError> {
        let missing = |message: &str| CloudError::Storage {
            operation: "get",
            bucket: bucket.to_string(),
            key: key.to_string(),
            message: message.to_string(),
        };
        if self.failing_gets.lock().unwrap().contains(key) {
            return Err(missing("injected failure"));
        }
        self.object(bucket, key)
            .map(|o| o.body)
            .ok_or_else(|| missing("NoSuchKey"))
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), CloudError> {
        if self.failing_puts.lock().unwrap().contains(key) {
            return Err(CloudError::UploadFailed {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: "injected failure".to_string(),
            });
        }
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), CloudError> {
        self.objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ListPage, CloudError> {
        *self.list_calls.lock().unwrap() += 1;

        let objects = self.objects.lock().unwrap();
        let mut remaining = objects
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| k.clone())
            .filter(|k| continuation.as_ref().is_none_or(|after| k > after));

        let keys: Vec<String> = remaining.by_ref().take(self.page_size).collect();
        let next = match remaining.next() {
            Some(_) => keys.last().cloned(),
            None => None,
        };
        Ok(ListPage { keys, next })
    }

    async fn bucket_region(&self, _bucket: &str) -> Result<String, CloudError> {
        Ok(self.region.clone())
    }
}

// ---------------------------------------------------------------------------
// FakeJobBackend
// ---------------------------------------------------------------------------

/// Labeling backend that records every request.
///
/// Pipeline starts are collapsed on the client request token the way the
/// real backend does it.
#[derive(Default)]
pub struct FakeJobBackend {
    jobs: Mutex<Vec<JobSummary>>,
    created: Mutex<Vec<LabelingJobRequest>>,
    started: Mutex<Vec<PipelineExecutionRequest>>,
    executions: Mutex<HashMap<String, String>>,
    list_calls: Mutex<usize>,
    fail_create: Mutex<Option<CloudError>>,
}

impl FakeJobBackend {
    pub fn with_jobs(jobs: Vec<JobSummary>) -> Self {
        Self {
            jobs: Mutex::new(jobs),
            ..Self::default()
        }
    }

    pub fn fail_create_with(&self, err: CloudError) {
        *self.fail_create.lock().unwrap() = Some(err);
    }

    pub fn created(&self) -> Vec<LabelingJobRequest> {
        self.created.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<PipelineExecutionRequest> {
        self.started.lock().unwrap().clone()
    }

    /// Distinct pipeline executions actually started.
    pub fn execution_count(&self) -> usize {
        self.executions.lock().unwrap().len()
    }

    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }
}

#[async_trait]
impl JobBackend for FakeJobBackend {
    async fn list_jobs(
        &self,
        name_prefix: &str,
        limit: usize,
    ) -> Result<Vec<JobSummary>, CloudError> {
        *self.list_calls.lock().unwrap() += 1;
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|j| j.name.contains(name_prefix))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn create_labeling_job(
        &self,
        request: &LabelingJobRequest,
    ) -> Result<String, CloudError> {
        if let Some(err) = self.fail_create.lock().unwrap().take() {
            return Err(err);
        }
        self.created.lock().unwrap().push(request.clone());
        Ok(format!(
            "arn:aws:sagemaker:{REGION}:123456789012:labeling-job/{}",
            request.job_name
        ))
    }

    async fn start_pipeline_execution(
        &self,
        request: &PipelineExecutionRequest,
    ) -> Result<String, CloudError> {
        self.started.lock().unwrap().push(request.clone());
        let mut executions = self.executions.lock().unwrap();
        let next = executions.len() + 1;
        let arn = executions
            .entry(request.client_request_token.clone())
            .or_insert_with(|| {
                format!(
                    "arn:aws:sagemaker:{REGION}:123456789012:pipeline/{}/execution/{next}",
                    request.pipeline_name
                )
            })
            .clone();
        Ok(arn)
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn profile() -> LabelingProfile {
    LabelingProfile {
        project_prefix: PREFIX.to_string(),
        project_friendly_name: "Froth Anomaly Detection".to_string(),
        region: REGION.to_string(),
        input_bucket: INPUT_BUCKET.to_string(),
        output_bucket: OUTPUT_BUCKET.to_string(),
        instructions_bucket: "froth-instructions".to_string(),
        streaming_sns_topic_arn: Some(format!("arn:aws:sns:{REGION}:123456789012:froth-stream")),
        role_arn: "arn:aws:iam::123456789012:role/groundtruth".to_string(),
        workforce: Workforce::Private {
            workteam_arn: workteam_arn(),
        },
        task_type: TaskType::SemanticSegmentation,
        label_attribute_name: "objects-ref".to_string(),
        task_title: "Froth labeling job".to_string(),
        task_description: "Outline froth anomalies".to_string(),
        task_keywords: vec!["image".to_string(), "segmentation".to_string()],
        environment_tag: "test".to_string(),
        auto_labeling: false,
    }
}

pub fn context(blob: Arc<MemoryBlobStore>, backend: Arc<FakeJobBackend>) -> PipelineContext {
    PipelineContext::new(
        blob,
        backend,
        profile(),
        DROP_BUCKET.to_string(),
        vec!["froth".to_string(), "bubble".to_string()],
    )
}

pub fn workteam_arn() -> String {
    format!("arn:aws:sagemaker:{REGION}:123456789012:workteam/private-crowd/froth")
}

pub fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> Timestamp {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

pub fn job(name: &str, status: JobStatus, created: Timestamp) -> JobSummary {
    JobSummary {
        name: name.to_string(),
        arn: format!("arn:aws:sagemaker:{REGION}:123456789012:labeling-job/{name}"),
        status,
        creation_time: created,
        output_manifest_uri: Some(format!(
            "s3://{OUTPUT_BUCKET}/{name}/manifests/output/output.manifest"
        )),
        workteam_arn: workteam_arn(),
        label_counters: LabelCounters::default(),
    }
}

pub fn with_counters(mut job: JobSummary, unlabeled: u32, failed: u32) -> JobSummary {
    job.label_counters = LabelCounters {
        total_labeled: 10,
        unlabeled,
        failed_non_retryable: failed,
    };
    job
}

/// Encode a solid `width`×`height` RGB image.
pub fn encoded_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = DynamicImage::new_rgb8(width, height);
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}
