//! Progress file backing resume.
//!
//! The store maps work item id to its confirmed [`SubmissionResult`]. It is
//! read once when a run starts and rewritten in full after every batch:
//! - A missing or unreadable file means "no prior progress"
//! - Malformed records are dropped individually, well-formed ones survive
//! - Writes go to a sibling temp file, flushed to disk, then renamed over the
//!   target

use crate::error::PersistenceError;
use crate::item::SubmissionResult;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ResultStore {
    path: PathBuf,
    results: HashMap<String, SubmissionResult>,
}

impl ResultStore {
    /// Empty store that will persist to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            results: HashMap::new(),
        }
    }

    /// Load prior progress. Never fails: any read or decode problem yields
    /// an empty store.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let mut store = Self::new(path);

        let raw = match tokio::fs::read_to_string(&store.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No progress file at {}, starting fresh", store.path.display());
                return store;
            }
            Err(e) => {
                warn!(
                    "Could not read progress file {}: {}. Starting fresh",
                    store.path.display(),
                    e
                );
                return store;
            }
        };

        let records = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(records)) => records,
            Ok(_) => {
                warn!(
                    "Progress file {} is not a JSON array. Starting fresh",
                    store.path.display()
                );
                return store;
            }
            Err(e) => {
                warn!(
                    "Progress file {} is corrupt: {}. Starting fresh",
                    store.path.display(),
                    e
                );
                return store;
            }
        };

        let mut skipped = 0usize;
        for record in records {
            match serde_json::from_value::<SubmissionResult>(record) {
                Ok(result) if !result.id.is_empty() => {
                    store.results.insert(result.id.clone(), result);
                }
                Ok(_) => skipped += 1,
                Err(e) => {
                    debug!("Skipping malformed progress record: {}", e);
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            warn!(
                skipped,
                path = %store.path.display(),
                "Dropped malformed progress records"
            );
        }
        info!(
            "Loaded {} completed mints from {}",
            store.results.len(),
            store.path.display()
        );
        store
    }

    /// Write a full snapshot of the store, replacing the previous file.
    pub async fn save(&self) -> Result<(), PersistenceError> {
        let mut records: Vec<&SubmissionResult> = self.results.values().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        let bytes = serde_json::to_vec_pretty(&records)?;

        let write_err = |source: std::io::Error| PersistenceError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let tmp_path = temp_path(&self.path);
        let mut file = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(write_err)?;
        file.write_all(&bytes).await.map_err(write_err)?;
        // Data must be durable before the rename makes it visible.
        file.sync_all().await.map_err(write_err)?;
        drop(file);

        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(write_err)?;

        debug!(
            path = %self.path.display(),
            records = records.len(),
            "Progress saved"
        );
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, id: &str) -> bool {
        self.results.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&SubmissionResult> {
        self.results.get(id)
    }

    /// Record a confirmed mint. Replaces any earlier result for the same id.
    pub fn insert(&mut self, result: SubmissionResult) {
        self.results.insert(result.id.clone(), result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.results.keys().map(String::as_str)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
