//! Work items and mint results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single NFT to mint. `id` doubles as the idempotency key sent to the
/// minting API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,
    pub recipient: String,
    pub metadata: NftMetadata,
}

/// NFT descriptor forwarded to the minting API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NftMetadata {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<NftAttribute>,
    /// Keys we don't model (animation_url, external_url, ...) pass through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NftAttribute {
    pub trait_type: String,
    pub value: Value,
}

/// Confirmed mint, as persisted in the progress file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub id: String,
    #[serde(default)]
    pub on_chain: OnChainStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnChainStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
}
