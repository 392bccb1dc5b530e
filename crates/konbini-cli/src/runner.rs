//! Job orchestrator: one OS process per crawl job.
//!
//! Each job runs as a separate invocation of this same binary so a crash,
//! memory spike, or hang in one site's pipeline cannot touch another's. The
//! orchestrator launches every job together, suspends on join-all until each
//! reaches a terminal state, and records per-unit results; it never retries
//! and never escalates a job failure into a run failure.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::Context;
use futures::stream::{self, StreamExt};
use tokio::process::Command;

use konbini_core::{JobConfig, Stage};

/// Lifecycle of one spawned job.
///
/// `Pending -> Running -> {Succeeded, Failed}`. A job that cannot even be
/// spawned goes straight to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug)]
pub struct JobRun {
    pub name: String,
    pub state: JobState,
}

/// Spawn every job and wait for all of them to finish.
///
/// `max_concurrent == 0` launches all jobs at once; a positive value bounds
/// how many run simultaneously. Completion order is not significant — the
/// caller aggregates from log files afterwards.
///
/// # Errors
///
/// Fails only if the current executable path cannot be resolved; individual
/// job failures are recorded in the returned states, never propagated.
pub async fn run_all_jobs(
    jobs: &[JobConfig],
    stage: Stage,
    max_concurrent: usize,
) -> anyhow::Result<Vec<JobRun>> {
    let exe = std::env::current_exe().context("resolve current executable for job spawn")?;
    let concurrency = effective_concurrency(jobs.len(), max_concurrent);

    let runs: Vec<JobRun> = stream::iter(jobs)
        .map(|job| {
            let exe = exe.clone();
            async move { run_one(&exe, &job.name, stage).await }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let failed = runs.iter().filter(|r| r.state == JobState::Failed).count();
    if failed > 0 {
        tracing::warn!(failed, total = runs.len(), "some jobs failed during the run");
    }

    Ok(runs)
}

async fn run_one(exe: &Path, name: &str, stage: Stage) -> JobRun {
    let mut run = JobRun {
        name: name.to_string(),
        state: JobState::Pending,
    };

    let spawned = Command::new(exe)
        .arg(name)
        .args(["--stage", stage.as_str()])
        .stdin(Stdio::null())
        .spawn();

    let mut child = match spawned {
        Ok(child) => {
            run.state = JobState::Running;
            tracing::info!(job = %name, "job started");
            child
        }
        Err(e) => {
            tracing::error!(job = %name, error = %e, "failed to spawn job");
            run.state = JobState::Failed;
            return run;
        }
    };

    // The single suspension point at this layer: wait for the child to reach
    // a terminal state, however long that takes. Timeouts are an operator
    // concern, not enforced in-process.
    run.state = match child.wait().await {
        Ok(status) if status.success() => {
            tracing::info!(job = %name, "job succeeded");
            JobState::Succeeded
        }
        Ok(status) => {
            // Includes death by external signal (kill): a terminal Failed,
            // not an orchestrator fault.
            tracing::warn!(job = %name, %status, "job exited unsuccessfully");
            JobState::Failed
        }
        Err(e) => {
            tracing::error!(job = %name, error = %e, "failed waiting on job");
            JobState::Failed
        }
    };
    run
}

fn effective_concurrency(job_count: usize, max_concurrent: usize) -> usize {
    if max_concurrent == 0 {
        job_count.max(1)
    } else {
        max_concurrent
    }
}

/// Log file a job writes (and the aggregator reads) for `name`.
#[must_use]
pub fn job_log_path(log_dir: &Path, name: &str) -> PathBuf {
    log_dir.join(format!("{name}.log"))
}
