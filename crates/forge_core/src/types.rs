//! Request and artifact types shared across the factory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Caller-supplied session identifier
pub type SessionId = String;

/// Metadata schema version written alongside stored artifacts
pub const ARTIFACT_VERSION: &str = "1.0.0";

/// An inbound "start generation" request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Correlation key for the progress stream and the healing run
    #[serde(rename = "sessionId")]
    pub session_id: SessionId,
    /// Natural-language description of the contract
    pub description: String,
    /// Contract category (token, nft, staking, dao, ...)
    pub category: String,
    /// Who asked for it
    #[serde(default = "default_creator")]
    pub creator: String,
}

fn default_creator() -> String {
    "user".to_string()
}

impl GenerationRequest {
    pub fn new(
        session_id: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            description: description.into(),
            category: category.into(),
            creator: default_creator(),
        }
    }

    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = creator.into();
        self
    }

    /// Reject blank ids, descriptions, and categories.
    pub fn validate(&self) -> CoreResult<()> {
        let mut missing = Vec::new();
        if self.session_id.trim().is_empty() {
            missing.push("sessionId");
        }
        if self.description.trim().is_empty() {
            missing.push("description");
        }
        if self.category.trim().is_empty() {
            missing.push("category");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::InvalidRequest(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )))
        }
    }
}

/// Metadata stored next to an accepted contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetadata {
    pub generation_id: i64,
    pub description: String,
    pub category: String,
    pub creator: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl ArtifactMetadata {
    /// Build metadata for a request, stamped now.
    pub fn for_request(request: &GenerationRequest) -> Self {
        let now = Utc::now();
        Self {
            generation_id: now.timestamp_millis(),
            description: request.description.clone(),
            category: request.category.clone(),
            creator: request.creator.clone(),
            timestamp: now,
            version: ARTIFACT_VERSION.to_string(),
        }
    }
}

/// The final accepted code plus its metadata, as handed to the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratedArtifact {
    pub code: String,
    pub metadata: ArtifactMetadata,
}

impl GeneratedArtifact {
    pub fn new(code: impl Into<String>, metadata: ArtifactMetadata) -> Self {
        Self {
            code: code.into(),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_creator() {
        let request: GenerationRequest = serde_json::from_str(
            r#"{"sessionId":"s1","description":"A token","category":"token"}"#,
        )
        .unwrap();
        assert_eq!(request.creator, "user");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_request_validation_lists_missing_fields() {
        let request = GenerationRequest::new("s1", "  ", "");
        let err = request.validate().unwrap_err().to_string();
        assert!(err.contains("description"));
        assert!(err.contains("category"));
        assert!(!err.contains("sessionId"));
    }

    #[test]
    fn test_metadata_for_request() {
        let request = GenerationRequest::new("s1", "Staking pool", "staking").with_creator("erd1abc");
        let metadata = ArtifactMetadata::for_request(&request);
        assert_eq!(metadata.category, "staking");
        assert_eq!(metadata.creator, "erd1abc");
        assert_eq!(metadata.version, ARTIFACT_VERSION);

        let value = serde_json::to_value(&metadata).unwrap();
        assert!(value.get("generationId").is_some());
    }
}
