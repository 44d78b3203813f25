//! Input manifest publication.

mod common;

use common::{MemoryBlobStore, INPUT_BUCKET};
use labelchain_core::manifest::{parse_manifest, INPUT_MANIFEST_KEY};
use labelchain_pipeline::manifest::build_manifest;

#[tokio::test]
async fn manifest_lists_every_image_across_pages() {
    let blob = MemoryBlobStore::with_page_size(3);
    for i in 0..8 {
        blob.insert(INPUT_BUCKET, &format!("img-{i:02}.jpg"), vec![0]);
    }
    blob.insert(INPUT_BUCKET, "class_labels.json", b"{}".to_vec());
    blob.insert(INPUT_BUCKET, "nested/", Vec::new());

    let summary = build_manifest(&blob, INPUT_BUCKET).await.unwrap();

    assert_eq!(summary.entries, 8);
    assert_eq!(summary.uri, format!("s3://{INPUT_BUCKET}/{INPUT_MANIFEST_KEY}"));

    let stored = blob.object(INPUT_BUCKET, INPUT_MANIFEST_KEY).unwrap();
    assert_eq!(stored.content_type, "application/x-ndjson");

    let text = String::from_utf8(stored.body).unwrap();
    let entries = parse_manifest(&text).unwrap();
    let refs: Vec<String> = entries.into_iter().map(|e| e.source_ref).collect();
    let expected: Vec<String> = (0..8)
        .map(|i| format!("s3://{INPUT_BUCKET}/img-{i:02}.jpg"))
        .collect();
    assert_eq!(refs, expected);
}

#[tokio::test]
async fn rebuilding_skips_the_previous_manifest() {
    let blob = MemoryBlobStore::new();
    blob.insert(INPUT_BUCKET, "a.png", vec![0]);

    build_manifest(&blob, INPUT_BUCKET).await.unwrap();
    let summary = build_manifest(&blob, INPUT_BUCKET).await.unwrap();

    assert_eq!(summary.entries, 1);
}

#[tokio::test]
async fn empty_bucket_publishes_empty_manifest() {
    let blob = MemoryBlobStore::new();

    let summary = build_manifest(&blob, INPUT_BUCKET).await.unwrap();

    assert_eq!(summary.entries, 0);
    let stored = blob.object(INPUT_BUCKET, INPUT_MANIFEST_KEY).unwrap();
    assert!(stored.body.is_empty());
}
