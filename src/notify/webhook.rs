use std::time::Duration;

use reqwest::Client;
use serde_json::json;

use super::{LossReview, Notifier};
use crate::config::NotificationsConfig;
use crate::error::NotifyError;

/// Posts notifications as JSON to a chat webhook.
///
/// Each message carries the target channel name, so a single incoming webhook
/// can fan out to the team, wins and loss-review channels.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
    team_channel: String,
    wins_channel: String,
    loss_review_channel: String,
}

impl WebhookNotifier {
    pub fn from_config(url: &str, config: &NotificationsConfig) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            team_channel: config.team_channel.clone(),
            wins_channel: config.wins_channel.clone(),
            loss_review_channel: config.loss_review_channel.clone(),
        })
    }

    async fn post(&self, body: serde_json::Value) -> Result<bool, NotifyError> {
        let response = self.client.post(&self.url).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(true)
    }
}

impl Notifier for WebhookNotifier {
    async fn notify_team_channel(&self, message: &str) -> Result<bool, NotifyError> {
        self.post(json!({ "channel": self.team_channel, "text": message }))
            .await
    }

    async fn notify_win(&self, message: &str) -> Result<bool, NotifyError> {
        self.post(json!({ "channel": self.wins_channel, "text": message }))
            .await
    }

    async fn notify_loss_review(&self, review: &LossReview) -> Result<bool, NotifyError> {
        let text = format!(
            "Loss review needed: lead {} (${:.2}) lost after {} days: {}",
            review.lead_id, review.estimated_value, review.days_in_pipeline, review.reason
        );
        self.post(json!({
            "channel": self.loss_review_channel,
            "text": text,
            "fields": review,
        }))
        .await
    }
}
