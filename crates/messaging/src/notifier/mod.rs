//! Outbound notifications.
//!
//! Services publish [`MessagingEvent`]s through an [`EventDispatcher`] after
//! their transaction commits. Delivery happens on a background task, so a
//! slow or failing [`Notifier`] never blocks or fails the operation.

mod logging;
mod webhook;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::types::MessagingEvent;

pub use logging::LogNotifier;
pub use webhook::WebhookNotifier;

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("notification transport failed: {0}")]
    Transport(String),

    #[error("notification rejected with status {0}")]
    Rejected(u16),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &MessagingEvent) -> Result<(), NotifierError>;
}

/// Non-blocking handle for publishing events.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    sender: Option<mpsc::Sender<MessagingEvent>>,
}

impl EventDispatcher {
    /// Dispatcher feeding a bounded queue the caller drains itself.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<MessagingEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// Dispatcher drained by a spawned task that hands every event to
    /// `notifier`. Must be called from within a Tokio runtime.
    pub fn spawn(notifier: Arc<dyn Notifier>, capacity: usize) -> Self {
        let (dispatcher, mut receiver) = Self::channel(capacity);

        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                if let Err(err) = notifier.notify(&event).await {
                    warn!(
                        event_type = event.event_type(),
                        conversation_id = event.conversation_id(),
                        error = %err,
                        "notification failed"
                    );
                }
            }
            debug!("event dispatcher stopped");
        });

        dispatcher
    }

    /// Dispatcher that drops every event.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Queue an event. Never waits; a full or closed queue drops the event.
    pub fn publish(&self, event: MessagingEvent) {
        let Some(sender) = &self.sender else {
            return;
        };

        match sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => warn!(
                event_type = event.event_type(),
                conversation_id = event.conversation_id(),
                "notification queue full; dropping event"
            ),
            Err(TrySendError::Closed(event)) => warn!(
                event_type = event.event_type(),
                "notification queue closed; dropping event"
            ),
        }
    }
}
