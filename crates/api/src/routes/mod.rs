pub mod conversations;
pub mod health;
pub mod invitations;
pub mod messages;
pub mod models;
