//! Resumable NFT batch minting
//!
//! Mints a list of NFTs against a remote minting API in fixed-size batches,
//! recording each confirmed mint in a progress file so an interrupted run can
//! be restarted without minting anything twice.
//!
//! ## Module Structure
//!
//! - `item`: Work items and mint results
//! - `input`: Work list loading and validation
//! - `store`: Progress file (resume state)
//! - `client`: Minting API client
//! - `retry`: Bounded retry with exponential backoff
//! - `runner`: Batch runner tying it all together
//! - `config`: Client configuration
//! - `error`: Error types

pub mod client;
pub mod config;
pub mod error;
pub mod input;
pub mod item;
pub mod retry;
pub mod runner;
pub mod store;

pub use client::{HttpMintClient, Submitter};
pub use config::{Environment, MintConfig, DEFAULT_CHAIN, DEFAULT_TIMEOUT_SECS};
pub use error::{ConfigError, InputError, MintError, PersistenceError, SubmissionError};
pub use input::{format_recipient, load_work_items, parse_work_items};
pub use item::{NftAttribute, NftMetadata, OnChainStatus, SubmissionResult, WorkItem};
pub use retry::{RetryPolicy, DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_ATTEMPTS};
pub use runner::{
    plan, BatchPlan, BatchRunner, RunOptions, RunSummary, DEFAULT_BATCH_PAUSE_MS,
    DEFAULT_BATCH_SIZE, DEFAULT_PROGRESS_FILE,
};
pub use store::ResultStore;
