//! Outbound notifications for pipeline events.
//!
//! [`Notifier`] is the contract the orchestrator depends on. [`WebhookNotifier`]
//! posts to a chat webhook, [`LogNotifier`] only writes to the log and is used
//! when notifications are switched off.

mod webhook;

pub use webhook::WebhookNotifier;

use serde::Serialize;

use crate::error::NotifyError;

/// Context sent along when a high-value loss needs a review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LossReview {
    pub lead_id: String,
    pub agent_id: String,
    pub reason: String,
    pub estimated_value: f64,
    pub qualified: bool,
    pub days_in_pipeline: i64,
}

/// Delivers pipeline notifications.
///
/// `Ok(false)` means the channel declined the message; `Err` means the
/// notifier itself failed.
#[allow(async_fn_in_trait)]
pub trait Notifier {
    async fn notify_team_channel(&self, message: &str) -> Result<bool, NotifyError>;

    async fn notify_win(&self, message: &str) -> Result<bool, NotifyError>;

    async fn notify_loss_review(&self, review: &LossReview) -> Result<bool, NotifyError>;
}

/// Writes notifications to the log instead of sending them anywhere.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn notify_team_channel(&self, message: &str) -> Result<bool, NotifyError> {
        tracing::info!(channel = "team", %message, "notification");
        Ok(true)
    }

    async fn notify_win(&self, message: &str) -> Result<bool, NotifyError> {
        tracing::info!(channel = "wins", %message, "notification");
        Ok(true)
    }

    async fn notify_loss_review(&self, review: &LossReview) -> Result<bool, NotifyError> {
        tracing::info!(
            channel = "loss-review",
            lead_id = %review.lead_id,
            agent_id = %review.agent_id,
            reason = %review.reason,
            value = review.estimated_value,
            "notification"
        );
        Ok(true)
    }
}

/// Notifier picked at startup from configuration.
#[derive(Debug, Clone)]
pub enum ConfiguredNotifier {
    Webhook(WebhookNotifier),
    Log(LogNotifier),
}

impl Notifier for ConfiguredNotifier {
    async fn notify_team_channel(&self, message: &str) -> Result<bool, NotifyError> {
        match self {
            ConfiguredNotifier::Webhook(n) => n.notify_team_channel(message).await,
            ConfiguredNotifier::Log(n) => n.notify_team_channel(message).await,
        }
    }

    async fn notify_win(&self, message: &str) -> Result<bool, NotifyError> {
        match self {
            ConfiguredNotifier::Webhook(n) => n.notify_win(message).await,
            ConfiguredNotifier::Log(n) => n.notify_win(message).await,
        }
    }

    async fn notify_loss_review(&self, review: &LossReview) -> Result<bool, NotifyError> {
        match self {
            ConfiguredNotifier::Webhook(n) => n.notify_loss_review(review).await,
            ConfiguredNotifier::Log(n) => n.notify_loss_review(review).await,
        }
    }
}
