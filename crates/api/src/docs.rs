use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health_check,
        crate::routes::conversations::create_conversation,
        crate::routes::conversations::list_conversations,
        crate::routes::conversations::get_conversation,
        crate::routes::conversations::add_participants,
        crate::routes::conversations::list_participants,
        crate::routes::conversations::change_role,
        crate::routes::conversations::leave_conversation,
        crate::routes::conversations::set_muted,
        crate::routes::conversations::deactivate_conversation,
        crate::routes::conversations::mark_as_read,
        crate::routes::conversations::mark_as_delivered,
        crate::routes::conversations::unread_count,
        crate::routes::messages::list_messages,
        crate::routes::messages::create_message,
        crate::routes::messages::get_message,
        crate::routes::messages::edit_message,
        crate::routes::messages::delete_message,
        crate::routes::messages::list_receipts,
        crate::routes::invitations::list_invitations,
        crate::routes::invitations::create_invitation,
        crate::routes::invitations::get_invitation,
        crate::routes::invitations::accept_invitation,
        crate::routes::invitations::decline_invitation
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            crate::routes::health::HealthResponse,
            crate::routes::models::CreateConversationBody,
            crate::routes::models::AddParticipantsBody,
            crate::routes::models::AcknowledgeBody,
            crate::routes::models::MuteBody,
            crate::routes::models::ChangeRoleBody,
            crate::routes::models::PostMessageBody,
            crate::routes::models::EditMessageBody,
            crate::routes::models::CreateInvitationBody,
            crate::routes::models::ConversationsResponse,
            crate::routes::models::ConversationResponse,
            crate::routes::models::ConversationStateResponse,
            crate::routes::models::ParticipantsResponse,
            crate::routes::models::ParticipantResponse,
            crate::routes::models::AddParticipantsResponse,
            crate::routes::models::ReadResponse,
            crate::routes::models::DeliveredResponse,
            crate::routes::models::UnreadCountResponse,
            crate::routes::models::MessagesResponse,
            crate::routes::models::MessageResponse,
            crate::routes::models::ReceiptsResponse,
            crate::routes::models::InvitationsResponse,
            crate::routes::models::InvitationResponse
        )
    ),
    tags(
        (name = "Health", description = "Service health endpoints"),
        (name = "Conversations", description = "Creating, listing and closing conversations"),
        (name = "Participants", description = "Conversation membership and roles"),
        (name = "Messages", description = "Message log"),
        (name = "Receipts", description = "Delivery receipts and unread counts"),
        (name = "Invitations", description = "Invitation workflow")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        let schemes = &mut components.security_schemes;

        let mut scheme = SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer));
        if let SecurityScheme::Http(http) = &mut scheme {
            http.bearer_format = Some("user id".to_string());
        }

        schemes.insert("bearerAuth".to_string(), scheme);
    }
}
