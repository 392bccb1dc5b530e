use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ConfigError;

/// Job name reserved by the CLI to mean "run every job".
pub const ALL_JOBS: &str = "all";

/// One named crawl job: a site feed the pipeline ingests end to end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Unique job name; doubles as the log file stem and the
    /// `origin.source_site` of every record the job emits.
    pub name: String,
    /// Extraction endpoint serving the site's normalized record feed.
    pub feed_url: String,
}

#[derive(Debug, Deserialize)]
pub struct JobsFile {
    pub jobs: Vec<JobConfig>,
}

impl JobsFile {
    /// Find a job by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&JobConfig> {
        self.jobs.iter().find(|j| j.name == name)
    }
}

/// Load and validate the job definitions from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails
/// validation.
pub fn load_jobs(path: &Path) -> Result<JobsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::JobsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let jobs_file: JobsFile = serde_yaml::from_str(&content)?;

    validate_jobs(&jobs_file)?;

    Ok(jobs_file)
}

fn validate_jobs(jobs_file: &JobsFile) -> Result<(), ConfigError> {
    if jobs_file.jobs.is_empty() {
        return Err(ConfigError::Validation(
            "jobs file defines no jobs".to_string(),
        ));
    }

    let mut seen_names = HashSet::new();

    for job in &jobs_file.jobs {
        if job.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "job name must be non-empty".to_string(),
            ));
        }

        if job.name == ALL_JOBS {
            return Err(ConfigError::Validation(format!(
                "job name '{ALL_JOBS}' is reserved"
            )));
        }

        if !seen_names.insert(job.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate job name: '{}'",
                job.name
            )));
        }

        let parsed = Url::parse(&job.feed_url).map_err(|e| {
            ConfigError::Validation(format!("job '{}' has invalid feed_url: {e}", job.name))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "job '{}' feed_url must be http(s), got '{}'",
                job.name,
                parsed.scheme()
            )));
        }
    }

    Ok(())
}
