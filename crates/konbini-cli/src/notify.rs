//! Outbound run notification.
//!
//! The transport is a single JSON webhook POST; whatever sits behind it
//! (chat, paging, a relay) picks alert severity from the status field.
//! Delivery failure is logged and never retried, and never changes the
//! run's own exit code.

use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;

use crate::analyzer::Status;
use crate::outcome::{JobOutcome, RunSummary};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned status {0}")]
    UnexpectedStatus(u16),
}

pub struct Notifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl Notifier {
    /// # Errors
    ///
    /// Returns [`NotifyError::Http`] if the HTTP client cannot be built.
    pub fn new(webhook_url: Option<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            webhook_url,
        })
    }

    /// Post the run report to the configured webhook.
    ///
    /// A run with no webhook configured skips delivery and succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] on transport failure or a non-2xx response.
    pub async fn notify(
        &self,
        status: Status,
        summary: &RunSummary,
        outcomes: &[JobOutcome],
    ) -> Result<(), NotifyError> {
        let Some(url) = &self.webhook_url else {
            tracing::debug!("no notification webhook configured; skipping delivery");
            return Ok(());
        };

        let jobs: BTreeMap<&str, &JobOutcome> = outcomes
            .iter()
            .map(|o| (o.job_name.as_str(), o))
            .collect();
        let payload = serde_json::json!({
            "status": status.as_str(),
            "summary": summary,
            "jobs": jobs,
        });

        let response = self.client.post(url).json(&payload).send().await?;
        let http_status = response.status();
        if !http_status.is_success() {
            return Err(NotifyError::UnexpectedStatus(http_status.as_u16()));
        }

        tracing::info!(status = %status, "run notification delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn outcome(name: &str) -> JobOutcome {
        JobOutcome {
            job_name: name.to_string(),
            items_collected: 10,
            error_count: 1,
            elapsed_seconds: 30,
        }
    }

    #[tokio::test]
    async fn posts_status_summary_and_per_job_details() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(serde_json::json!({
                "status": "success",
                "summary": {"total_collected": 10, "total_errors": 1, "max_elapsed_seconds": 30},
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = Notifier::new(Some(format!("{}/hook", server.uri()))).unwrap();
        let summary = RunSummary {
            total_collected: 10,
            total_errors: 1,
            max_elapsed_seconds: 30,
        };
        notifier
            .notify(Status::Success, &summary, &[outcome("gs25web")])
            .await
            .expect("delivery should succeed");
    }

    #[tokio::test]
    async fn non_success_response_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier = Notifier::new(Some(server.uri())).unwrap();
        let err = notifier
            .notify(Status::Error, &RunSummary::default(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::UnexpectedStatus(500)));
    }

    #[tokio::test]
    async fn missing_webhook_skips_delivery() {
        let notifier = Notifier::new(None).unwrap();
        notifier
            .notify(Status::Debug, &RunSummary::default(), &[])
            .await
            .expect("skip should succeed");
    }
}
