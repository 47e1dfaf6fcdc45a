//! Integration tests shared by the local and in-memory stores.

use std::sync::Arc;

use forge_core::{ArtifactMetadata, GenerationRequest};
use forge_store::{content_id, encode_document, ArtifactStore, LocalStore, MemoryStore, StoreError};

fn metadata(category: &str) -> ArtifactMetadata {
    ArtifactMetadata::for_request(&GenerationRequest::new("s1", "A contract", category))
}

async fn exercise(store: Arc<dyn ArtifactStore>) {
    let token = metadata("token");
    let nft = metadata("nft");

    let a = store.put("token code", &token).await.unwrap();
    let b = store.put("nft code", &nft).await.unwrap();
    assert_ne!(a, b);

    assert_eq!(store.get(&a).await.unwrap().code, "token code");
    assert_eq!(store.get(&b).await.unwrap().metadata.category, "nft");
    assert!(matches!(
        store.get(&"f".repeat(64)).await,
        Err(StoreError::NotFound(_))
    ));
    assert!(store.check().await.is_ok());
}

#[tokio::test]
async fn test_memory_store_contract() {
    exercise(Arc::new(MemoryStore::new())).await;
}

#[tokio::test]
async fn test_local_store_contract() {
    let temp = tempfile::TempDir::new().unwrap();
    exercise(Arc::new(LocalStore::new(temp.path()))).await;
}

/// Both stores derive the same identifier from the same document.
#[tokio::test]
async fn test_stores_agree_on_addressing() {
    let temp = tempfile::TempDir::new().unwrap();
    let metadata = metadata("dao");
    let expected = content_id(&encode_document("dao code", &metadata).unwrap());

    let memory = MemoryStore::new();
    let local = LocalStore::new(temp.path());
    assert_eq!(memory.put("dao code", &metadata).await.unwrap(), expected);
    assert_eq!(local.put("dao code", &metadata).await.unwrap(), expected);
}

/// Stored documents keep the metadata timestamp exactly.
#[tokio::test]
async fn test_timestamp_round_trips() {
    let store = MemoryStore::new();
    let mut metadata = metadata("token");
    metadata.timestamp = chrono::DateTime::parse_from_rfc3339("2026-01-01T12:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);

    let cid = store.put("x", &metadata).await.unwrap();
    assert_eq!(store.get(&cid).await.unwrap().metadata.timestamp, metadata.timestamp);
}
