//! Per-job outcome aggregation.
//!
//! Every job appends one stats block to its log file on completion. The
//! block is a fixed line grammar — a marker line followed by `key: value`
//! pairs — parsed with a small tokenizer here; nothing in a log file is ever
//! evaluated as code. A log without a parseable block means the job crashed
//! before the stats flush: it is excluded from aggregation, not zeroed.

use std::path::Path;

use serde::Serialize;

use konbini_pipeline::JobStats;

/// Marker line preceding a stats block.
pub const STATS_MARKER: &str = "=== crawl stats ===";

const KEY_ITEMS_COLLECTED: &str = "items_collected";
const KEY_ERROR_COUNT: &str = "error_count";
const KEY_ELAPSED_SECONDS: &str = "elapsed_seconds";

/// Parsed end-of-run statistics for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobOutcome {
    pub job_name: String,
    pub items_collected: u64,
    /// Defaults to 0 when the key is absent: the writer omits it for clean
    /// runs, so absence means "no errors logged", not "unknown".
    pub error_count: u64,
    /// Wall-clock runtime, integer-truncated on ingestion.
    pub elapsed_seconds: u64,
}

/// Cross-job aggregate for one run.
///
/// `max_elapsed_seconds` is a max, not a sum: jobs overlap in wall-clock
/// time, so the run is bounded by its slowest job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total_collected: u64,
    pub total_errors: u64,
    pub max_elapsed_seconds: u64,
}

/// Render the stats block a job appends to its log.
///
/// `error_count` is omitted when zero; the parser defaults it.
#[must_use]
pub fn render_stats_block(stats: &JobStats, elapsed_seconds: f64) -> String {
    let mut block = format!("{STATS_MARKER}\n{KEY_ITEMS_COLLECTED}: {}\n", stats.collected);
    if stats.errors > 0 {
        block.push_str(&format!("{KEY_ERROR_COUNT}: {}\n", stats.errors));
    }
    block.push_str(&format!("{KEY_ELAPSED_SECONDS}: {elapsed_seconds:.3}\n"));
    block
}

/// Parse the stats block out of a job's log contents.
///
/// The *last* marker in the file wins, so a rerun appended to an old log
/// supersedes stale stats. Returns `None` if no marker is present or the
/// block is missing a required key.
#[must_use]
pub fn parse_stats_block(job_name: &str, content: &str) -> Option<JobOutcome> {
    let lines: Vec<&str> = content.lines().collect();
    let marker_idx = lines
        .iter()
        .rposition(|line| line.trim_end() == STATS_MARKER)?;

    let mut items_collected: Option<u64> = None;
    let mut error_count: u64 = 0;
    let mut elapsed_seconds: Option<f64> = None;

    for line in &lines[marker_idx + 1..] {
        let Some((key, value)) = tokenize_stat_line(line) else {
            // First non-conforming line ends the block.
            break;
        };
        match key {
            KEY_ITEMS_COLLECTED => items_collected = value.parse().ok(),
            KEY_ERROR_COUNT => error_count = value.parse().ok()?,
            KEY_ELAPSED_SECONDS => elapsed_seconds = value.parse().ok(),
            // Unknown keys are tolerated for forward compatibility.
            _ => {}
        }
    }

    let elapsed = elapsed_seconds?;
    if !elapsed.is_finite() || elapsed < 0.0 {
        return None;
    }

    // Integer truncation is intentional; sub-second precision carries no
    // signal at the two-hour threshold scale.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let elapsed_seconds = elapsed as u64;

    Some(JobOutcome {
        job_name: job_name.to_string(),
        items_collected: items_collected?,
        error_count,
        elapsed_seconds,
    })
}

/// Split one `key: value` stat line; `None` if the line doesn't conform.
fn tokenize_stat_line(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() || value.is_empty() {
        return None;
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return None;
    }
    Some((key, value))
}

/// Read and parse every named job's log under `log_dir`.
///
/// Jobs whose log is missing or has no parseable block are skipped with a
/// warning and excluded from aggregation.
#[must_use]
pub fn collect_outcomes(log_dir: &Path, job_names: &[String]) -> Vec<JobOutcome> {
    let mut outcomes = Vec::new();
    for name in job_names {
        let log_path = log_dir.join(format!("{name}.log"));
        let content = match std::fs::read_to_string(&log_path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(job = %name, path = %log_path.display(), error = %e, "job log unreadable; excluded from aggregation");
                continue;
            }
        };
        match parse_stats_block(name, &content) {
            Some(outcome) => outcomes.push(outcome),
            None => {
                tracing::warn!(job = %name, path = %log_path.display(), "no parseable stats block; excluded from aggregation");
            }
        }
    }
    outcomes
}

/// Aggregate per-job outcomes into the run summary.
#[must_use]
pub fn summarize(outcomes: &[JobOutcome]) -> RunSummary {
    let mut summary = RunSummary::default();
    for outcome in outcomes {
        summary.total_collected += outcome.items_collected;
        summary.total_errors += outcome.error_count;
        summary.max_elapsed_seconds = summary.max_elapsed_seconds.max(outcome.elapsed_seconds);
    }
    summary
}
