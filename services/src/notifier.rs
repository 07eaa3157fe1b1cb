use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

use crate::collaborators::{Notification, Notifier};

/// Posts reminders to a chat webhook as `{content, allowed_mentions}`.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        let body = json!({
            "content": notification.content,
            "allowed_mentions": { "users": [notification.user_id] },
        });
        self.client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .context("webhook request failed")?
            .error_for_status()
            .context("webhook rejected the notification")?;
        Ok(())
    }
}

/// Writes reminders to the log instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        tracing::info!(
            assignment_id = %notification.assignment_id,
            user_id = %notification.user_id,
            window = %notification.window,
            content = %notification.content,
            "reminder"
        );
        Ok(())
    }
}
