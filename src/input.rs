//! Work list loading.
//!
//! The input file is a JSON array of `{ id, walletAddress, metadata }`
//! records. Every record is decoded into a [`WorkItem`] up front so a bad
//! file fails before anything is minted.

use crate::error::InputError;
use crate::item::{NftMetadata, WorkItem};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InputRecord {
    id: String,
    #[serde(alias = "recipient")]
    wallet_address: String,
    metadata: NftMetadata,
}

/// Read and validate the work list at `path`.
pub async fn load_work_items(path: &Path, chain: &str) -> Result<Vec<WorkItem>, InputError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(InputError::NotFound(path.to_path_buf()))
        }
        Err(source) => {
            return Err(InputError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let items = parse_work_items(&raw, chain)?;
    info!("Loaded {} work items from {}", items.len(), path.display());
    Ok(items)
}

/// Decode a work list from JSON text.
pub fn parse_work_items(raw: &str, chain: &str) -> Result<Vec<WorkItem>, InputError> {
    let value: Value = serde_json::from_str(raw).map_err(InputError::Parse)?;
    let Value::Array(records) = value else {
        return Err(InputError::NotArray);
    };

    let mut seen = HashSet::with_capacity(records.len());
    let mut items = Vec::with_capacity(records.len());

    for (index, record) in records.into_iter().enumerate() {
        let record: InputRecord = serde_json::from_value(record)
            .map_err(|source| InputError::InvalidRecord { index, source })?;

        let id = record.id.trim().to_string();
        if id.is_empty() {
            return Err(InputError::EmptyId { index });
        }
        if !seen.insert(id.clone()) {
            return Err(InputError::DuplicateId(id));
        }

        items.push(WorkItem {
            id,
            recipient: format_recipient(&record.wallet_address, chain),
            metadata: record.metadata,
        });
    }

    Ok(items)
}

/// Qualify a bare address into the `<chain>:<address>` or
/// `email:<address>:<chain>` form the minting API expects.
pub fn format_recipient(address: &str, chain: &str) -> String {
    let address = address.trim();
    if address.contains(':') {
        address.to_string()
    } else if address.contains('@') {
        format!("email:{}:{}", address, chain)
    } else {
        format!("{}:{}", chain, address)
    }
}
