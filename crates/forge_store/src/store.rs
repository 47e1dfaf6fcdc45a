//! Artifact store trait.

use async_trait::async_trait;
use forge_core::{ArtifactMetadata, GeneratedArtifact};

use crate::error::StoreResult;

/// Persists accepted contract source by content identifier.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Store `content` with `metadata` and return its identifier.
    async fn put(&self, content: &str, metadata: &ArtifactMetadata) -> StoreResult<String>;

    /// Fetch a stored artifact.
    async fn get(&self, cid: &str) -> StoreResult<GeneratedArtifact>;

    /// Probe connectivity and credentials.
    async fn check(&self) -> StoreResult<()>;
}
