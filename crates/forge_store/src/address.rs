//! Content addressing shared by the local and in-memory stores.

use forge_core::{ArtifactMetadata, GeneratedArtifact};
use sha2::{Digest, Sha256};

use crate::error::StoreResult;

/// Serialize the stored document for `content` and `metadata`.
pub fn encode_document(content: &str, metadata: &ArtifactMetadata) -> StoreResult<Vec<u8>> {
    let artifact = GeneratedArtifact::new(content, metadata.clone());
    Ok(serde_json::to_vec_pretty(&artifact)?)
}

/// Lowercase hex SHA-256 of `document`.
pub fn content_id(document: &[u8]) -> String {
    format!("{:x}", Sha256::digest(document))
}

/// Whether `cid` has the shape [`content_id`] produces.
pub fn is_content_id(cid: &str) -> bool {
    cid.len() == 64 && cid.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id_shape() {
        let cid = content_id(b"hello");
        assert_eq!(
            cid,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert!(is_content_id(&cid));
        assert!(!is_content_id("../etc/passwd"));
        assert!(!is_content_id(&cid.to_uppercase()));
    }
}
