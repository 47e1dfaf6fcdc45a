//! Directory-backed artifact store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use forge_core::{ArtifactMetadata, GeneratedArtifact};
use tracing::{debug, info};

use crate::address::{content_id, encode_document, is_content_id};
use crate::error::{StoreError, StoreResult};
use crate::store::ArtifactStore;

/// Stores each artifact as `<dir>/<sha256>.json`.
///
/// Existing documents are never rewritten.
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, cid: &str) -> PathBuf {
        self.dir.join(format!("{}.json", cid))
    }
}

#[async_trait]
impl ArtifactStore for LocalStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn put(&self, content: &str, metadata: &ArtifactMetadata) -> StoreResult<String> {
        let document = encode_document(content, metadata)?;
        let cid = content_id(&document);
        let path = self.path_for(&cid);

        if tokio::fs::try_exists(&path).await? {
            debug!("Artifact {} already stored", cid);
            return Ok(cid);
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let staging = self.dir.join(format!(".{}.tmp", cid));
        tokio::fs::write(&staging, &document).await?;
        tokio::fs::rename(&staging, &path).await?;

        info!("Stored artifact {} at {}", cid, path.display());
        Ok(cid)
    }

    async fn get(&self, cid: &str) -> StoreResult<GeneratedArtifact> {
        if !is_content_id(cid) {
            return Err(StoreError::NotFound(cid.to_string()));
        }

        match tokio::fs::read(self.path_for(cid)).await {
            Ok(document) => Ok(serde_json::from_slice(&document)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(cid.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn check(&self) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let metadata = tokio::fs::metadata(&self.dir).await?;
        if metadata.permissions().readonly() {
            return Err(StoreError::NotConfigured(format!(
                "{} is read-only",
                self.dir.display()
            )));
        }
        Ok(())
    }
}
