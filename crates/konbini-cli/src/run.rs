//! Run flow: dispatch a single-job or full ("all") run and, for the latter,
//! drive orchestration → aggregation → classification → notification.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;

use konbini_core::{AppConfig, JobsFile, Stage, ALL_JOBS};
use konbini_db::{PoolConfig, Store};

use crate::analyzer::{self, Mode, Status};
use crate::notify::Notifier;
use crate::outcome;
use crate::runner::{self, job_log_path};
use crate::{job, Cli};

/// Execute the parsed CLI invocation and produce the process exit code.
///
/// # Errors
///
/// Returns an error when the run itself cannot proceed (bad config, unknown
/// job, failed job body); classification-driven non-zero exits are encoded
/// in the returned `ExitCode` instead.
pub async fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = konbini_core::load_app_config()?;
    let jobs = konbini_core::load_jobs(&config.jobs_path)?;

    if cli.site == ALL_JOBS {
        run_all(cli.stage, cli.clear_all, &config, &jobs).await
    } else {
        run_single(&cli.site, cli.stage, cli.clear_all, &config, &jobs).await
    }
}

/// One isolated job in this process. The exit code reflects only whether the
/// job completed, never health classification.
async fn run_single(
    site: &str,
    stage: Stage,
    clear_all: bool,
    config: &AppConfig,
    jobs: &JobsFile,
) -> anyhow::Result<ExitCode> {
    let job_config = jobs
        .get(site)
        .with_context(|| format!("unknown job '{site}' (not defined in the jobs file)"))?
        .clone();

    init_job_logging(&job_log_path(&config.log_dir, &job_config.name), &log_level(stage, config))?;

    if clear_all {
        tracing::warn!("--clear-all is only meaningful with 'all'; ignoring");
    }

    if let Err(e) = job::run_to_completion(&job_config, stage, config).await {
        tracing::error!(job = %job_config.name, error = format!("{e:#}"), "job failed");
        return Err(e);
    }
    Ok(ExitCode::SUCCESS)
}

/// The full run: every configured job, then aggregation and health analysis.
/// The exit code reflects the health classification alone, as long as
/// aggregation itself completed.
async fn run_all(
    stage: Stage,
    clear_all: bool,
    config: &AppConfig,
    jobs: &JobsFile,
) -> anyhow::Result<ExitCode> {
    init_stderr_logging(&log_level(stage, config));
    tracing::info!(stage = %stage, jobs = jobs.jobs.len(), "starting full crawl run");

    if clear_all {
        clear_collections(stage, config).await?;
    }

    runner::run_all_jobs(&jobs.jobs, stage, config.max_concurrent_jobs).await?;

    let names: Vec<String> = jobs.jobs.iter().map(|j| j.name.clone()).collect();
    let outcomes = outcome::collect_outcomes(&config.log_dir, &names);
    let summary = outcome::summarize(&outcomes);
    let status = analyzer::classify(&summary, Mode::from_stage(stage));
    tracing::info!(
        status = %status,
        total_collected = summary.total_collected,
        total_errors = summary.total_errors,
        max_elapsed_seconds = summary.max_elapsed_seconds,
        jobs_aggregated = outcomes.len(),
        "run classified"
    );

    // Test runs stay silent; dev runs notify with the debug status so the
    // receiving side can route them away from real alerts.
    if stage != Stage::Test {
        send_notification(status, &summary, &outcomes, config).await;
    }

    Ok(if status == Status::Success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Administrative wipe ahead of a full re-ingest.
async fn clear_collections(stage: Stage, config: &AppConfig) -> anyhow::Result<()> {
    if stage.is_dry_run() {
        tracing::warn!("test stage: skipping --clear-all");
        return Ok(());
    }

    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is not set")?;
    let pool = konbini_db::connect_pool(database_url, PoolConfig::from_app_config(config))
        .await
        .context("connect to storage for --clear-all")?;
    konbini_db::run_migrations(&pool)
        .await
        .context("run storage migrations")?;
    Store::durable(pool)
        .clear_all()
        .await
        .context("clear collections")?;
    Ok(())
}

/// Delivery failure is logged and swallowed: the run's own result never
/// depends on the notification transport.
async fn send_notification(
    status: Status,
    summary: &outcome::RunSummary,
    outcomes: &[outcome::JobOutcome],
    config: &AppConfig,
) {
    let notifier = match Notifier::new(config.notify_webhook_url.clone()) {
        Ok(notifier) => notifier,
        Err(e) => {
            tracing::error!(error = %e, "failed to build notifier");
            return;
        }
    };
    if let Err(e) = notifier.notify(status, summary, outcomes).await {
        tracing::error!(error = %e, "notification delivery failed");
    }
}

/// dev and test runs log at debug like the original tooling; prod follows
/// the configured level. `RUST_LOG` overrides both.
fn log_level(stage: Stage, config: &AppConfig) -> String {
    match stage {
        Stage::Prod => config.log_level.clone(),
        Stage::Dev | Stage::Test => "debug".to_string(),
    }
}

fn env_filter(level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level))
}

fn init_stderr_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .init();
}

/// Job processes log to their dedicated file; the stats block is appended to
/// the same file on completion. The file is truncated per run so the
/// aggregator never reads a stale block by accident.
fn init_job_logging(log_path: &Path, level: &str) -> anyhow::Result<()> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = std::fs::File::create(log_path)
        .with_context(|| format!("create job log file {}", log_path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .init();
    Ok(())
}
