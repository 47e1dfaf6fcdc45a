//! In-process artifact store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use forge_core::{ArtifactMetadata, GeneratedArtifact};
use parking_lot::RwLock;
use tracing::debug;

use crate::address::{content_id, encode_document};
use crate::error::{StoreError, StoreResult};
use crate::store::ArtifactStore;

/// Content-addressed store held in memory. Clones share the same contents.
#[derive(Clone, Default)]
pub struct MemoryStore {
    documents: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    pub fn cids(&self) -> Vec<String> {
        self.documents.read().keys().cloned().collect()
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, content: &str, metadata: &ArtifactMetadata) -> StoreResult<String> {
        let document = encode_document(content, metadata)?;
        let cid = content_id(&document);
        self.documents.write().entry(cid.clone()).or_insert(document);
        debug!("Stored artifact {} in memory", cid);
        Ok(cid)
    }

    async fn get(&self, cid: &str) -> StoreResult<GeneratedArtifact> {
        let documents = self.documents.read();
        let document = documents
            .get(cid)
            .ok_or_else(|| StoreError::NotFound(cid.to_string()))?;
        Ok(serde_json::from_slice(document)?)
    }

    async fn check(&self) -> StoreResult<()> {
        Ok(())
    }
}
