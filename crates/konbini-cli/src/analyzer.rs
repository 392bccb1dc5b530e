//! Run-health classification.
//!
//! A pure function over the aggregated [`RunSummary`]; the result is the
//! sole input the notification side uses to pick alert severity. Non-prod
//! stages bypass the thresholds entirely so alerting never fires on them.

use konbini_core::Stage;

use crate::outcome::RunSummary;

/// A production run must collect at least this many items.
const MIN_COLLECTED: u64 = 5000;
/// Highest tolerable error rate, in percent of collected items.
const MAX_ERROR_RATE_PERCENT: u64 = 10;
/// Wall-clock budget for the slowest job.
const MAX_ELAPSED_SECONDS: u64 = 7200;

/// Classification context, derived from the run's stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// A real production run; classify by the numeric thresholds.
    Normal,
    Debug,
    Test,
}

impl Mode {
    #[must_use]
    pub const fn from_stage(stage: Stage) -> Self {
        match stage {
            Stage::Prod => Mode::Normal,
            Stage::Dev => Mode::Debug,
            Stage::Test => Mode::Test,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Debug,
    Test,
}

impl Status {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Error => "error",
            Status::Debug => "debug",
            Status::Test => "test",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a run's aggregate metrics.
///
/// All three thresholds must hold for `Success`; any violation is `Error`.
/// A run that collected nothing fails the error-rate arm by definition.
#[must_use]
pub fn classify(summary: &RunSummary, mode: Mode) -> Status {
    match mode {
        Mode::Debug => return Status::Debug,
        Mode::Test => return Status::Test,
        Mode::Normal => {}
    }

    let enough_collected = summary.total_collected >= MIN_COLLECTED;
    // 100 * errors / collected <= limit, kept in integers without division
    // so a 10.02% rate doesn't round down to "exactly 10".
    let error_rate_ok = summary.total_collected > 0
        && 100 * summary.total_errors <= MAX_ERROR_RATE_PERCENT * summary.total_collected;
    let within_time_budget = summary.max_elapsed_seconds <= MAX_ELAPSED_SECONDS;

    if enough_collected && error_rate_ok && within_time_budget {
        Status::Success
    } else {
        Status::Error
    }
}
