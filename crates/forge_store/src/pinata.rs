//! IPFS pinning through the Pinata HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use forge_core::{ArtifactMetadata, GeneratedArtifact};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::error::{StoreError, StoreResult};
use crate::store::ArtifactStore;

const API_BASE: &str = "https://api.pinata.cloud";
const GATEWAY: &str = "https://gateway.pinata.cloud/ipfs";

/// Artifact store that pins JSON documents to IPFS.
pub struct PinataStore {
    api_key: String,
    secret_key: String,
    api_base: String,
    gateway: String,
    retrieve_timeout: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PinRequest<'a> {
    pinata_content: &'a GeneratedArtifact,
    pinata_metadata: serde_json::Value,
    pinata_options: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

impl PinataStore {
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: secret_key.into(),
            api_base: API_BASE.to_string(),
            gateway: GATEWAY.to_string(),
            retrieve_timeout: Duration::from_secs(10),
            client: reqwest::Client::new(),
        }
    }

    /// Create a store from `PINATA_API_KEY` / `PINATA_SECRET_KEY`.
    pub fn from_env() -> StoreResult<Self> {
        let key = std::env::var("PINATA_API_KEY").unwrap_or_default();
        let secret = std::env::var("PINATA_SECRET_KEY").unwrap_or_default();
        if key.is_empty() || secret.is_empty() {
            return Err(StoreError::NotConfigured(
                "Set PINATA_API_KEY and PINATA_SECRET_KEY".to_string(),
            ));
        }
        Ok(Self::new(key, secret))
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_gateway(mut self, gateway: impl Into<String>) -> Self {
        self.gateway = gateway.into().trim_end_matches('/').to_string();
        self
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("pinata_api_key", &self.api_key)
            .header("pinata_secret_api_key", &self.secret_key)
    }

    fn pin_request<'a>(artifact: &'a GeneratedArtifact) -> PinRequest<'a> {
        let metadata = &artifact.metadata;
        PinRequest {
            pinata_content: artifact,
            pinata_metadata: json!({
                "name": format!("contract-gen-{}.json", metadata.generation_id),
                "keyvalues": {
                    "generationId": metadata.generation_id.to_string(),
                    "category": metadata.category,
                    "creator": metadata.creator,
                }
            }),
            pinata_options: json!({ "cidVersion": 1 }),
        }
    }
}

async fn http_error(response: reqwest::Response) -> StoreError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    StoreError::Http { status, body }
}

#[async_trait]
impl ArtifactStore for PinataStore {
    fn name(&self) -> &'static str {
        "pinata"
    }

    async fn put(&self, content: &str, metadata: &ArtifactMetadata) -> StoreResult<String> {
        info!("Uploading code to IPFS for generation {}", metadata.generation_id);
        let artifact = GeneratedArtifact::new(content, metadata.clone());

        let response = self
            .authed(self.client.post(format!("{}/pinning/pinJSONToIPFS", self.api_base)))
            .json(&Self::pin_request(&artifact))
            .send()
            .await?;

        if !response.status().is_success() {
            let err = http_error(response).await;
            error!("IPFS upload failed: {}", err);
            return Err(err);
        }

        let pinned: PinResponse = response.json().await?;
        info!("Code uploaded to IPFS: {}", pinned.ipfs_hash);
        Ok(pinned.ipfs_hash)
    }

    async fn get(&self, cid: &str) -> StoreResult<GeneratedArtifact> {
        if cid.is_empty() || !cid.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(StoreError::NotFound(cid.to_string()));
        }

        let response = self
            .client
            .get(format!("{}/{}", self.gateway, cid))
            .timeout(self.retrieve_timeout)
            .send()
            .await?;

        match response.status().as_u16() {
            200..=299 => Ok(response.json().await?),
            404 => Err(StoreError::NotFound(cid.to_string())),
            _ => Err(http_error(response).await),
        }
    }

    async fn check(&self) -> StoreResult<()> {
        let response = self
            .authed(self.client.get(format!("{}/data/testAuthentication", self.api_base)))
            .send()
            .await?;

        if response.status().is_success() {
            info!("Pinata connection successful");
            Ok(())
        } else {
            Err(http_error(response).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_request_shape() {
        let request = forge_core::GenerationRequest::new("s1", "A token", "token").with_creator("erd1abc");
        let artifact = GeneratedArtifact::new("code", ArtifactMetadata::for_request(&request));
        let id = artifact.metadata.generation_id;

        let body = serde_json::to_value(PinataStore::pin_request(&artifact)).unwrap();
        assert_eq!(body["pinataContent"]["code"], "code");
        assert_eq!(body["pinataContent"]["metadata"]["version"], "1.0.0");
        assert_eq!(body["pinataMetadata"]["name"], format!("contract-gen-{}.json", id));
        assert_eq!(body["pinataMetadata"]["keyvalues"]["creator"], "erd1abc");
        assert_eq!(body["pinataOptions"]["cidVersion"], 1);
    }

    #[tokio::test]
    async fn test_rejects_malformed_cid_without_network() {
        let store = PinataStore::new("k", "s").with_gateway("http://127.0.0.1:9");
        assert!(matches!(store.get("../x").await, Err(StoreError::NotFound(_))));
    }
}
