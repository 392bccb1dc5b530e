use std::path::PathBuf;

/// Operating stage of a run, passed on the command line and forwarded to
/// every spawned job.
///
/// `Test` runs skip storage writes entirely; `Dev` runs write but classify
/// with the debug override so alerting never fires; `Prod` is the real thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Dev,
    Prod,
    Test,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::Dev => "dev",
            Stage::Prod => "prod",
            Stage::Test => "test",
        }
    }

    /// Parse a CLI/env stage string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dev" => Some(Stage::Dev),
            "prod" => Some(Stage::Prod),
            "test" => Some(Stage::Test),
            _ => None,
        }
    }

    /// Whether storage writes are suppressed for this stage.
    #[must_use]
    pub const fn is_dry_run(self) -> bool {
        matches!(self, Stage::Test)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// Storage connection string. Optional so dry-run (test stage) runs can
    /// operate with no storage at all; durable runs fail at store setup if
    /// it is absent.
    pub database_url: Option<String>,
    pub log_level: String,
    /// Directory holding one log file per job; also where the outcome
    /// aggregator looks for stats blocks.
    pub log_dir: PathBuf,
    pub jobs_path: PathBuf,
    /// Webhook for run notifications. Absent means notifications are skipped.
    pub notify_webhook_url: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub feed_request_timeout_secs: u64,
    pub feed_user_agent: String,
    /// Upper bound on concurrently running jobs; 0 launches all at once.
    pub max_concurrent_jobs: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("log_level", &self.log_level)
            .field("log_dir", &self.log_dir)
            .field("jobs_path", &self.jobs_path)
            .field(
                "notify_webhook_url",
                &self.notify_webhook_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "feed_request_timeout_secs",
                &self.feed_request_timeout_secs,
            )
            .field("feed_user_agent", &self.feed_user_agent)
            .field("max_concurrent_jobs", &self.max_concurrent_jobs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_round_trips_through_parse_and_display() {
        for stage in [Stage::Dev, Stage::Prod, Stage::Test] {
            assert_eq!(Stage::parse(stage.as_str()), Some(stage));
        }
        assert_eq!(Stage::parse("staging"), None);
    }

    #[test]
    fn only_test_stage_is_dry_run() {
        assert!(Stage::Test.is_dry_run());
        assert!(!Stage::Dev.is_dry_run());
        assert!(!Stage::Prod.is_dry_run());
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = AppConfig {
            database_url: Some("postgres://user:secret@db/konbini".to_string()),
            log_level: "info".to_string(),
            log_dir: PathBuf::from("./logs"),
            jobs_path: PathBuf::from("./config/jobs.yaml"),
            notify_webhook_url: Some("https://hooks.example.com/T000/B000".to_string()),
            db_max_connections: 10,
            db_min_connections: 1,
            db_acquire_timeout_secs: 10,
            feed_request_timeout_secs: 30,
            feed_user_agent: "konbini/0.1".to_string(),
            max_concurrent_jobs: 0,
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret"));
        assert!(!rendered.contains("hooks.example.com"));
        assert!(rendered.contains("[redacted]"));
    }
}
