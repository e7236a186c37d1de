//! Input validation.

use relay_config::MessagingConfig;
use relay_database::{AttachmentRef, MessageType};

use crate::types::{MessagingError, MessagingResult};

const MAX_TITLE_LENGTH: usize = 255;
const MAX_INVITATION_MESSAGE_LENGTH: usize = 1000;

/// Validation utilities
pub struct Validator;

impl Validator {
    /// Trim a conversation title; blank titles become `None`.
    pub fn conversation_title(title: Option<&str>) -> MessagingResult<Option<String>> {
        let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(None);
        };

        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(MessagingError::validation(format!(
                "title too long (max {MAX_TITLE_LENGTH} characters)"
            )));
        }

        Ok(Some(title.to_string()))
    }

    /// A message needs text or an attachment, and media types need an attachment.
    pub fn message_body(
        content: &str,
        message_type: MessageType,
        attachment: Option<&AttachmentRef>,
        settings: &MessagingConfig,
    ) -> MessagingResult<()> {
        if content.trim().is_empty() && attachment.is_none() {
            return Err(MessagingError::validation(
                "message needs content or an attachment",
            ));
        }

        Self::message_content_length(content, settings)?;

        if message_type.expects_attachment() && attachment.is_none() {
            return Err(MessagingError::validation(format!(
                "{message_type} messages need an attachment"
            )));
        }

        if let Some(attachment) = attachment {
            if attachment.file_id.trim().is_empty() {
                return Err(MessagingError::validation("attachment file_id is empty"));
            }
            if attachment.size_bytes.is_some_and(|size| size < 0) {
                return Err(MessagingError::validation("attachment size is negative"));
            }
        }

        Ok(())
    }

    /// Edited content must be non-blank and within the length limit.
    pub fn edited_content(content: &str, settings: &MessagingConfig) -> MessagingResult<()> {
        if content.trim().is_empty() {
            return Err(MessagingError::validation("message content cannot be empty"));
        }
        Self::message_content_length(content, settings)
    }

    fn message_content_length(content: &str, settings: &MessagingConfig) -> MessagingResult<()> {
        if content.chars().count() > settings.max_message_length {
            return Err(MessagingError::validation(format!(
                "message too long (max {} characters)",
                settings.max_message_length
            )));
        }
        Ok(())
    }

    pub fn invitation_message(message: Option<&str>) -> MessagingResult<Option<String>> {
        let Some(message) = message.map(str::trim).filter(|m| !m.is_empty()) else {
            return Ok(None);
        };

        if message.chars().count() > MAX_INVITATION_MESSAGE_LENGTH {
            return Err(MessagingError::validation(format!(
                "invitation message too long (max {MAX_INVITATION_MESSAGE_LENGTH} characters)"
            )));
        }

        Ok(Some(message.to_string()))
    }

    /// Resolve paging against the configured defaults and cap.
    pub fn page(
        limit: Option<i64>,
        offset: Option<i64>,
        settings: &MessagingConfig,
    ) -> MessagingResult<(i64, i64)> {
        let limit = limit.unwrap_or(i64::from(settings.default_page_size));
        let offset = offset.unwrap_or(0);

        if limit < 1 {
            return Err(MessagingError::validation("limit must be positive"));
        }
        if offset < 0 {
            return Err(MessagingError::validation("offset cannot be negative"));
        }

        Ok((limit.min(i64::from(settings.max_page_size)), offset))
    }
}
