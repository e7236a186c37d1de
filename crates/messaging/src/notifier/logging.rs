use async_trait::async_trait;
use tracing::info;

use super::{Notifier, NotifierError};
use crate::types::MessagingEvent;

/// Writes every event to the log. Used when no webhook is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &MessagingEvent) -> Result<(), NotifierError> {
        info!(
            event_type = event.event_type(),
            conversation_id = event.conversation_id(),
            "messaging event"
        );
        Ok(())
    }
}
