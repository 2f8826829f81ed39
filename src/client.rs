//! Minting API client
//!
//! One call to [`Submitter::submit`] is exactly one `PUT` against
//! `{base}/collections/{collection}/nfts/{id}`, with the collection and item
//! id percent-encoded as single path segments. The remote side treats
//! repeated PUTs for the same id as the same mint, so callers may retry
//! freely. This client never retries on its own.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MintConfig;
use crate::error::{ConfigError, SubmissionError};
use crate::item::{NftMetadata, OnChainStatus, SubmissionResult, WorkItem};

/// Anything that can mint a single work item.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(
        &self,
        item: &WorkItem,
        reupload_linked_files: bool,
    ) -> Result<SubmissionResult, SubmissionError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MintRequest<'a> {
    id: &'a str,
    metadata: &'a NftMetadata,
    recipient: &'a str,
    reupload_linked_files: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MintResponse {
    #[serde(default)]
    on_chain: OnChainStatus,
    #[serde(default)]
    action_id: Option<String>,
}

/// HTTP implementation of [`Submitter`]
pub struct HttpMintClient {
    client: Client,
    base: Url,
    config: MintConfig,
}

impl HttpMintClient {
    /// Fails if the base URL does not parse or cannot take path segments.
    pub fn new(config: MintConfig) -> Result<Self, ConfigError> {
        let raw_base = config.base_url();
        let base = Url::parse(&raw_base)
            .map_err(|e| ConfigError::Invalid(format!("base URL {}: {}", raw_base, e)))?;
        if base.cannot_be_a_base() {
            return Err(ConfigError::Invalid(format!(
                "base URL {} cannot carry a path",
                raw_base
            )));
        }

        let client = Client::builder().timeout(config.timeout).build()?;
        debug!(
            "Mint client: base={} collection={}",
            base, config.collection_id
        );
        Ok(Self {
            client,
            base,
            config,
        })
    }

    fn nft_url(&self, id: &str) -> Url {
        let mut url = self.base.clone();
        // `new` rejected cannot-be-a-base URLs, so this always succeeds.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["collections", self.config.collection_id.as_str(), "nfts", id]);
        }
        url
    }
}

#[async_trait]
impl Submitter for HttpMintClient {
    async fn submit(
        &self,
        item: &WorkItem,
        reupload_linked_files: bool,
    ) -> Result<SubmissionResult, SubmissionError> {
        let body = MintRequest {
            id: &item.id,
            metadata: &item.metadata,
            recipient: &item.recipient,
            reupload_linked_files,
        };

        let response = self
            .client
            .put(self.nft_url(&item.id))
            .header("X-API-KEY", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| SubmissionError::Transport {
                id: item.id.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SubmissionError::Status {
                id: item.id.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MintResponse = response.json().await.map_err(|e| SubmissionError::Decode {
            id: item.id.clone(),
            reason: e.to_string(),
        })?;

        debug!(
            id = %item.id,
            status = %parsed.on_chain.status,
            "Mint accepted"
        );

        Ok(SubmissionResult {
            id: item.id.clone(),
            on_chain: parsed.on_chain,
            action_id: parsed.action_id,
        })
    }
}
