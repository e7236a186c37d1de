use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::{Notifier, NotifierError};
use crate::types::MessagingEvent;

/// POSTs each event as JSON to a fixed URL.
#[derive(Clone)]
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifierError> {
        let http = reqwest::Client::builder()
            .user_agent("relay-messaging")
            .timeout(timeout)
            .build()
            .map_err(|e| NotifierError::Transport(format!("failed to build client: {e}")))?;

        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, event: &MessagingEvent) -> Result<(), NotifierError> {
        let response = self
            .http
            .post(&self.url)
            .json(event)
            .send()
            .await
            .map_err(|e| NotifierError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifierError::Rejected(status.as_u16()));
        }

        debug!(event_type = event.event_type(), "webhook delivered");
        Ok(())
    }
}
