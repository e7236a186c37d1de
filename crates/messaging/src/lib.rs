//! # Relay Messaging Crate
//!
//! Core business logic for employee-to-employee messaging inside a
//! business: conversations and their participants, the message log,
//! per-recipient delivery receipts, unread counts and invitations.
//!
//! ## Architecture
//!
//! - **Services**: `ConversationRegistry`, `MessageLog`, `DeliveryTracker`,
//!   `UnreadCounter` and `InvitationWorkflow`, bundled as [`MessagingCore`]
//! - **Directory**: employee lookups through a timeout-bounded, fail-closed gate
//! - **Notifier**: post-commit events delivered on a background task
//! - **Types**: requests, views, events and errors
//! - **Utils**: permission checks and input validation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_messaging::{MessagingContext, MessagingCore, AppendMessageRequest};
//!
//! let core = MessagingCore::new(MessagingContext::new(pool, directory, events, settings));
//! let message = core
//!     .messages
//!     .append(&conversation_id, user_id, AppendMessageRequest::text("hello"))
//!     .await?;
//! ```

pub mod directory;
pub mod notifier;
pub mod services;
pub mod types;
pub mod utils;

pub use directory::{
    DirectoryError, DirectoryGate, EmployeeDirectory, HttpEmployeeDirectory,
    SqlEmployeeDirectory, StaticEmployeeDirectory,
};
pub use notifier::{EventDispatcher, LogNotifier, Notifier, NotifierError, WebhookNotifier};
pub use services::{
    ConversationRegistry, DeliveryTracker, InvitationWorkflow, MessageLog, MessagingContext,
    UnreadCounter,
};
pub use types::*;

/// All messaging services over one shared context.
#[derive(Clone)]
pub struct MessagingCore {
    pub conversations: ConversationRegistry,
    pub messages: MessageLog,
    pub delivery: DeliveryTracker,
    pub unread: UnreadCounter,
    pub invitations: InvitationWorkflow,
}

impl MessagingCore {
    pub fn new(ctx: MessagingContext) -> Self {
        Self {
            conversations: ConversationRegistry::new(ctx.clone()),
            messages: MessageLog::new(ctx.clone()),
            delivery: DeliveryTracker::new(ctx.clone()),
            unread: UnreadCounter::new(ctx.clone()),
            invitations: InvitationWorkflow::new(ctx),
        }
    }
}
