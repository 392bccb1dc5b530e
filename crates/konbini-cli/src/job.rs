//! Single-job execution: the body of one isolated crawl process.
//!
//! Fetches the job's extraction feed, runs every item through the commit
//! pipeline, and appends the stats block the outcome aggregator reads. A
//! feed or store-setup failure fails the job fast (non-zero exit, no stats
//! block); per-item failures are absorbed by the pipeline and only show up
//! in the counters.

use std::io::Write;
use std::path::Path;
use std::time::Instant;

use anyhow::Context;

use konbini_core::{AppConfig, JobConfig, Stage};
use konbini_db::{PoolConfig, Store};
use konbini_pipeline::{FeedClient, ItemPipeline, JobStats};

use crate::outcome::render_stats_block;
use crate::runner::job_log_path;

/// Run one job end to end and write its stats block.
///
/// # Errors
///
/// Fails if the store cannot be set up, the feed cannot be fetched, or the
/// stats block cannot be written — all of which surface to the orchestrator
/// as a Failed job.
pub async fn run_to_completion(
    job: &JobConfig,
    stage: Stage,
    config: &AppConfig,
) -> anyhow::Result<JobStats> {
    let started = Instant::now();
    tracing::info!(job = %job.name, stage = %stage, "job started");

    let store = build_store(stage, config).await?;
    let client = FeedClient::new(config.feed_request_timeout_secs, &config.feed_user_agent)
        .context("build feed client")?;

    let raws = client
        .fetch(&job.feed_url)
        .await
        .with_context(|| format!("fetch feed for job '{}'", job.name))?;
    tracing::info!(job = %job.name, records = raws.len(), "feed fetched");

    let pipeline = ItemPipeline::new(store);
    let mut stats = JobStats::default();
    for raw in raws {
        pipeline.process(raw, &job.name, &mut stats).await;
    }

    let elapsed_seconds = started.elapsed().as_secs_f64();
    let block = render_stats_block(&stats, elapsed_seconds);
    append_stats_block(&job_log_path(&config.log_dir, &job.name), &block)
        .context("append stats block to job log")?;

    tracing::info!(
        job = %job.name,
        collected = stats.collected,
        errors = stats.errors,
        elapsed_seconds,
        "job completed"
    );
    Ok(stats)
}

/// Construct the per-run store handle: dry-run for the test stage, a durable
/// pool otherwise.
async fn build_store(stage: Stage, config: &AppConfig) -> anyhow::Result<Store> {
    if stage.is_dry_run() {
        tracing::info!("test stage: storage writes disabled for this run");
        return Ok(Store::dry_run());
    }

    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is not set")?;
    let pool = konbini_db::connect_pool(database_url, PoolConfig::from_app_config(config))
        .await
        .context("connect to storage")?;
    konbini_db::run_migrations(&pool)
        .await
        .context("run storage migrations")?;
    Ok(Store::durable(pool))
}

fn append_stats_block(path: &Path, block: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(block.as_bytes())
}
