//! Error types for the mint runner.
//!
//! Startup failures (`ConfigError`, `InputError`) and checkpoint write
//! failures (`PersistenceError`) abort the run. `SubmissionError` is scoped
//! to a single work item and never escapes the batch it occurred in.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Input file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read input file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Input file is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("Input file must contain a JSON array at the top level")]
    NotArray,

    #[error("Invalid work item at index {index}: {source}")]
    InvalidRecord {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Work item at index {index} has an empty id")]
    EmptyId { index: usize },

    #[error("Duplicate work item id: {0}")]
    DuplicateId(String),
}

/// Failure of a single mint request.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Mint of {id} rejected with status {status}: {body}")]
    Status { id: String, status: u16, body: String },

    #[error("Mint request for {id} failed: {source}")]
    Transport {
        id: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid mint response for {id}: {reason}")]
    Decode { id: String, reason: String },
}

impl SubmissionError {
    /// Id of the work item this failure belongs to.
    pub fn item_id(&self) -> &str {
        match self {
            Self::Status { id, .. } | Self::Transport { id, .. } | Self::Decode { id, .. } => id,
        }
    }
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to serialize progress: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write progress file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that stop a whole run.
#[derive(Debug, Error)]
pub enum MintError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error("Checkpoint failed, halting run: {0}")]
    Persistence(#[from] PersistenceError),
}
