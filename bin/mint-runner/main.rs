//! Mint Runner
//!
//! Mints every NFT listed in an input file, resuming from the progress file
//! left by earlier runs.

use anyhow::{Context, Result};
use clap::Parser;
use mint_runner::{
    load_work_items, plan, BatchRunner, HttpMintClient, MintConfig, ResultStore, RetryPolicy,
    RunOptions, DEFAULT_BATCH_PAUSE_MS, DEFAULT_BATCH_SIZE, DEFAULT_CHAIN,
    DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_PROGRESS_FILE,
    DEFAULT_TIMEOUT_SECS,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "mint-runner")]
#[command(about = "Resumable batch minting of NFTs")]
struct Args {
    /// JSON file with an array of { id, walletAddress, metadata }
    #[arg(short, long)]
    input: PathBuf,

    /// Minting API key; staging keys select the staging endpoint
    #[arg(long, env = "MINT_API_KEY", hide_env_values = true, default_value = "")]
    api_key: String,

    /// Collection to mint into
    #[arg(long, env = "MINT_COLLECTION_ID", default_value = "")]
    collection_id: String,

    /// Override the API base URL
    #[arg(long, env = "MINT_BASE_URL")]
    base_url: Option<String>,

    /// Chain used to qualify bare wallet addresses
    #[arg(long, default_value = DEFAULT_CHAIN)]
    chain: String,

    /// Progress file used to resume interrupted runs
    #[arg(short, long, default_value = DEFAULT_PROGRESS_FILE)]
    progress_file: PathBuf,

    /// Items per batch
    #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Max concurrent requests per batch (defaults to batch size)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Attempts per item before giving up for this run
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    /// Wait before the first retry, doubled after each failure
    #[arg(long, default_value_t = DEFAULT_INITIAL_BACKOFF_MS)]
    initial_backoff_ms: u64,

    /// Pause between batches
    #[arg(long, default_value_t = DEFAULT_BATCH_PAUSE_MS)]
    batch_pause_ms: u64,

    /// Per-request timeout
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Ask the provider to re-upload files linked from the metadata
    #[arg(long)]
    reupload_linked_files: bool,

    /// Show what would be minted without calling the API
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mint_runner=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let mut options = RunOptions::default()
        .with_batch_size(args.batch_size)
        .with_batch_pause(Duration::from_millis(args.batch_pause_ms))
        .with_progress_path(&args.progress_file)
        .with_reupload_linked_files(args.reupload_linked_files);
    if let Some(concurrency) = args.concurrency {
        options = options.with_concurrency(concurrency);
    }
    options.validate()?;

    // Dry runs never touch the API, so they don't need credentials
    let config = if args.dry_run {
        None
    } else {
        let mut config = MintConfig::new(args.api_key, args.collection_id)?
            .with_timeout(Duration::from_secs(args.timeout_secs));
        if let Some(base_url) = args.base_url {
            config = config.with_base_url(base_url);
        }
        Some(config)
    };

    let items = load_work_items(&args.input, &args.chain)
        .await
        .context("Failed to load work list")?;

    let Some(config) = config else {
        let store = ResultStore::load(&args.progress_file).await;
        let plan = plan(&items, &store, options.batch_size);
        let sizes: Vec<usize> = plan.batches.iter().map(Vec::len).collect();
        info!("[dry-run] {} items in {}", items.len(), args.input.display());
        info!("[dry-run] {} already minted", plan.skipped);
        info!(
            "[dry-run] {} pending in {} batch(es): {:?}",
            plan.pending(),
            sizes.len(),
            sizes
        );
        return Ok(());
    };

    info!("Starting Mint Runner");
    info!("  Collection: {}", config.collection_id);
    info!("  Endpoint: {}", config.base_url());
    info!("  Progress file: {}", args.progress_file.display());

    let client = HttpMintClient::new(config)?;
    let retry = RetryPolicy::new(
        args.max_attempts,
        Duration::from_millis(args.initial_backoff_ms),
    );
    let runner = BatchRunner::new(client, retry, options);

    let summary = runner.run(&items).await?;

    info!(
        "Done: {} minted this run, {} skipped, {} failed, {}/{} complete",
        summary.succeeded,
        summary.skipped,
        summary.failed_ids.len(),
        summary.completed_total,
        summary.total
    );
    if !summary.failed_ids.is_empty() {
        warn!(
            "Failed ids (re-run to retry): {}",
            summary.failed_ids.join(", ")
        );
    }

    Ok(())
}
