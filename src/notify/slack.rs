use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

use super::{CriticalAlert, Notifier};

pub const ENV_SLACK_WEBHOOK: &str = "SLA_SLACK_WEBHOOK_URL";

pub struct SlackNotifier {
    webhook_url: String,
    client: Client,
    timeout: Duration,
}

impl SlackNotifier {
    pub fn from_env() -> Option<Self> {
        std::env::var(ENV_SLACK_WEBHOOK)
            .ok()
            .filter(|u| !u.trim().is_empty())
            .map(Self::new)
    }

    pub fn new(url: String) -> Self {
        Self {
            webhook_url: url,
            client: Client::new(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, alert: &CriticalAlert) -> Result<()> {
        let text = format!("*{}*\n```{}```", alert.subject, alert.body());
        let body = serde_json::json!({ "text": text });

        self.client
            .post(&self.webhook_url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .context("slack post")?
            .error_for_status()
            .context("slack non-2xx")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "slack"
    }
}
