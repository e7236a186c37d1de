//! Error types for the messaging core.

use relay_database::DatabaseError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::error;

/// Result type alias for messaging operations
pub type MessagingResult<T> = Result<T, MessagingError>;

/// Stable, machine-readable error identifier carried to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotAParticipant,
    Forbidden,
    InvalidParticipant,
    EmptyParticipants,
    InvalidReplyTarget,
    DuplicateInvitation,
    AlreadyParticipant,
    InvalidState,
    NotFound,
    Validation,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotAParticipant => "not_a_participant",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::InvalidParticipant => "invalid_participant",
            ErrorKind::EmptyParticipants => "empty_participants",
            ErrorKind::InvalidReplyTarget => "invalid_reply_target",
            ErrorKind::DuplicateInvitation => "duplicate_invitation",
            ErrorKind::AlreadyParticipant => "already_participant",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Validation => "validation",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for the messaging core
#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("User {user_id} is not an active participant of conversation {conversation_id}")]
    NotAParticipant { conversation_id: String, user_id: i64 },

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("User {user_id} is not an employee of business {business_id}")]
    InvalidParticipant { business_id: i64, user_id: i64 },

    #[error("At least one participant besides the creator is required")]
    EmptyParticipants,

    #[error("Message {message_id} cannot be replied to here")]
    InvalidReplyTarget { message_id: String },

    #[error("User {user_id} already has a pending invitation to this conversation")]
    DuplicateInvitation { user_id: i64 },

    #[error("User {user_id} is already a participant of this conversation")]
    AlreadyParticipant { user_id: i64 },

    #[error("Invalid state: {reason}")]
    InvalidState { reason: String },

    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Storage failure. The display text never includes the underlying cause.
    #[error("Internal error")]
    Internal {
        #[source]
        source: DatabaseError,
    },
}

impl MessagingError {
    pub fn not_a_participant(conversation_id: impl Into<String>, user_id: i64) -> Self {
        Self::NotAParticipant {
            conversation_id: conversation_id.into(),
            user_id,
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden { reason: reason.into() }
    }

    pub fn invalid_participant(business_id: i64, user_id: i64) -> Self {
        Self::InvalidParticipant { business_id, user_id }
    }

    pub fn invalid_reply_target(message_id: impl Into<String>) -> Self {
        Self::InvalidReplyTarget {
            message_id: message_id.into(),
        }
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState { reason: reason.into() }
    }

    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotAParticipant { .. } => ErrorKind::NotAParticipant,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::InvalidParticipant { .. } => ErrorKind::InvalidParticipant,
            Self::EmptyParticipants => ErrorKind::EmptyParticipants,
            Self::InvalidReplyTarget { .. } => ErrorKind::InvalidReplyTarget,
            Self::DuplicateInvitation { .. } => ErrorKind::DuplicateInvitation,
            Self::AlreadyParticipant { .. } => ErrorKind::AlreadyParticipant,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }
}

impl From<DatabaseError> for MessagingError {
    fn from(err: DatabaseError) -> Self {
        error!(error = %err, "storage operation failed");
        Self::Internal { source: err }
    }
}

impl From<sqlx::Error> for MessagingError {
    fn from(err: sqlx::Error) -> Self {
        DatabaseError::from(err).into()
    }
}
