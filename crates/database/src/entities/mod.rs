//! Domain entities for the database layer

pub mod conversation;
pub mod employee;
pub mod invitation;
pub mod message;
pub mod message_status;
pub mod participant;

pub use conversation::{Conversation, ConversationType, NewConversation};
pub use employee::Employee;
pub use invitation::{Invitation, InvitationStatus, NewInvitation};
pub use message::{AttachmentRef, Message, MessageType, NewMessage};
pub use message_status::{DeliveryStatus, Receipt};
pub use participant::{NewParticipant, Participant, ParticipantRole};
