//! Shared types for the messaging core.

pub mod errors;
pub mod events;
pub mod requests;
pub mod responses;

pub use errors::{ErrorKind, MessagingError, MessagingResult};
pub use events::MessagingEvent;
pub use requests::*;
pub use responses::*;
