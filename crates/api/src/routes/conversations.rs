use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use relay_messaging::ConversationFilter;

use crate::{
    error::ErrorResponse,
    routes::models::{
        AcknowledgeBody, AddParticipantsBody, AddParticipantsResponse, ChangeRoleBody,
        ConversationResponse, ConversationStateResponse, ConversationsResponse,
        CreateConversationBody, DeliveredResponse, ListConversationsParams, MuteBody,
        ParticipantResponse, ParticipantsResponse, ReadResponse, UnreadCountResponse,
    },
    ApiError, AppState,
};

#[utoipa::path(
    post,
    path = "/conversations",
    tag = "Conversations",
    security(("bearerAuth" = [])),
    request_body = CreateConversationBody,
    responses(
        (status = 200, description = "Conversation created", body = ConversationResponse),
        (status = 400, description = "Malformed conversation payload", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Creator is not an employee of the business", body = ErrorResponse),
        (status = 422, description = "Participant list empty or names a non-employee", body = ErrorResponse)
    )
)]
pub async fn create_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateConversationBody>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let user_id = state.caller(&headers).await?;
    let conversation = state
        .core()
        .conversations
        .create(user_id, body.into())
        .await?;

    Ok(Json(ConversationResponse { conversation }))
}

#[utoipa::path(
    get,
    path = "/conversations",
    tag = "Conversations",
    security(("bearerAuth" = [])),
    params(ListConversationsParams),
    responses(
        (status = 200, description = "Active conversations of the caller", body = ConversationsResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    )
)]
pub async fn list_conversations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListConversationsParams>,
) -> Result<Json<ConversationsResponse>, ApiError> {
    let user_id = state.caller(&headers).await?;
    let filter = ConversationFilter {
        business_id: params.business_id,
        conversation_type: params.conversation_type,
    };
    let conversations = state
        .core()
        .conversations
        .list_for_user(user_id, filter)
        .await?;

    Ok(Json(ConversationsResponse { conversations }))
}

#[utoipa::path(
    get,
    path = "/conversations/{conversation_id}",
    tag = "Conversations",
    security(("bearerAuth" = [])),
    params(("conversation_id" = String, Path, description = "Conversation public ID")),
    responses(
        (status = 200, description = "Conversation with its roster", body = ConversationResponse),
        (status = 403, description = "Caller is not a participant", body = ErrorResponse),
        (status = 404, description = "Conversation not found", body = ErrorResponse)
    )
)]
pub async fn get_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let user_id = state.caller(&headers).await?;
    let conversation = state
        .core()
        .conversations
        .get(&conversation_id, user_id)
        .await?;

    Ok(Json(ConversationResponse { conversation }))
}

#[utoipa::path(
    post,
    path = "/conversations/{conversation_id}/add_participants",
    tag = "Participants",
    security(("bearerAuth" = [])),
    params(("conversation_id" = String, Path, description = "Conversation public ID")),
    request_body = AddParticipantsBody,
    responses(
        (status = 200, description = "Participants added; already active users are listed separately", body = AddParticipantsResponse),
        (status = 403, description = "Caller is not an admin of the conversation", body = ErrorResponse),
        (status = 422, description = "A named user is not an employee", body = ErrorResponse)
    )
)]
pub async fn add_participants(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
    Json(body): Json<AddParticipantsBody>,
) -> Result<Json<AddParticipantsResponse>, ApiError> {
    let user_id = state.caller(&headers).await?;
    let outcome = state
        .core()
        .conversations
        .add_participants(&conversation_id, user_id, body.participant_ids)
        .await?;

    Ok(Json(AddParticipantsResponse {
        added: outcome.added,
        already_active: outcome.already_active,
    }))
}

#[utoipa::path(
    get,
    path = "/conversations/{conversation_id}/participants",
    tag = "Participants",
    security(("bearerAuth" = [])),
    params(("conversation_id" = String, Path, description = "Conversation public ID")),
    responses(
        (status = 200, description = "Active participants", body = ParticipantsResponse),
        (status = 403, description = "Caller is not a participant", body = ErrorResponse)
    )
)]
pub async fn list_participants(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
) -> Result<Json<ParticipantsResponse>, ApiError> {
    let user_id = state.caller(&headers).await?;
    let participants = state
        .core()
        .conversations
        .participants(&conversation_id, user_id)
        .await?;

    Ok(Json(ParticipantsResponse { participants }))
}

#[utoipa::path(
    patch,
    path = "/conversations/{conversation_id}/participants/{user_id}",
    tag = "Participants",
    security(("bearerAuth" = [])),
    params(
        ("conversation_id" = String, Path, description = "Conversation public ID"),
        ("user_id" = i64, Path, description = "Participant whose role changes")
    ),
    request_body = ChangeRoleBody,
    responses(
        (status = 200, description = "Role updated", body = ParticipantResponse),
        (status = 403, description = "Caller may not grant this role", body = ErrorResponse),
        (status = 404, description = "Participant not found", body = ErrorResponse)
    )
)]
pub async fn change_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((conversation_id, target_user_id)): Path<(String, i64)>,
    Json(body): Json<ChangeRoleBody>,
) -> Result<Json<ParticipantResponse>, ApiError> {
    let user_id = state.caller(&headers).await?;
    let participant = state
        .core()
        .conversations
        .change_role(&conversation_id, user_id, target_user_id, body.role)
        .await?;

    Ok(Json(ParticipantResponse { participant }))
}

#[utoipa::path(
    post,
    path = "/conversations/{conversation_id}/leave",
    tag = "Participants",
    security(("bearerAuth" = [])),
    params(("conversation_id" = String, Path, description = "Conversation public ID")),
    responses(
        (status = 204, description = "Caller left the conversation"),
        (status = 403, description = "Caller is not a participant", body = ErrorResponse)
    )
)]
pub async fn leave_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
) -> Result<axum::http::StatusCode, ApiError> {
    let user_id = state.caller(&headers).await?;
    state
        .core()
        .conversations
        .leave(&conversation_id, user_id)
        .await?;

    Ok(axum::http::StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/conversations/{conversation_id}/mute",
    tag = "Participants",
    security(("bearerAuth" = [])),
    params(("conversation_id" = String, Path, description = "Conversation public ID")),
    request_body = MuteBody,
    responses(
        (status = 200, description = "Mute flag updated", body = ParticipantResponse),
        (status = 403, description = "Caller is not a participant", body = ErrorResponse)
    )
)]
pub async fn set_muted(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
    Json(body): Json<MuteBody>,
) -> Result<Json<ParticipantResponse>, ApiError> {
    let user_id = state.caller(&headers).await?;
    let participant = state
        .core()
        .conversations
        .set_muted(&conversation_id, user_id, body.muted)
        .await?;

    Ok(Json(ParticipantResponse { participant }))
}

#[utoipa::path(
    post,
    path = "/conversations/{conversation_id}/deactivate",
    tag = "Conversations",
    security(("bearerAuth" = [])),
    params(("conversation_id" = String, Path, description = "Conversation public ID")),
    responses(
        (status = 200, description = "Conversation deactivated", body = ConversationStateResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse)
    )
)]
pub async fn deactivate_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
) -> Result<Json<ConversationStateResponse>, ApiError> {
    let user_id = state.caller(&headers).await?;
    let conversation = state
        .core()
        .conversations
        .deactivate(&conversation_id, user_id)
        .await?;

    Ok(Json(ConversationStateResponse { conversation }))
}

#[utoipa::path(
    post,
    path = "/conversations/{conversation_id}/mark_as_read",
    tag = "Receipts",
    security(("bearerAuth" = [])),
    params(("conversation_id" = String, Path, description = "Conversation public ID")),
    request_body = AcknowledgeBody,
    responses(
        (status = 200, description = "Read cursor advanced", body = ReadResponse),
        (status = 400, description = "Neither or both of mark_all and message_ids given", body = ErrorResponse),
        (status = 403, description = "Caller is not a participant", body = ErrorResponse)
    )
)]
pub async fn mark_as_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
    Json(body): Json<AcknowledgeBody>,
) -> Result<Json<ReadResponse>, ApiError> {
    let user_id = state.caller(&headers).await?;
    let selection = body.into_selection()?;
    let outcome = state
        .core()
        .conversations
        .mark_read(&conversation_id, user_id, selection)
        .await?;

    Ok(Json(outcome.into()))
}

#[utoipa::path(
    post,
    path = "/conversations/{conversation_id}/mark_as_delivered",
    tag = "Receipts",
    security(("bearerAuth" = [])),
    params(("conversation_id" = String, Path, description = "Conversation public ID")),
    request_body = AcknowledgeBody,
    responses(
        (status = 200, description = "Receipts advanced to delivered", body = DeliveredResponse),
        (status = 403, description = "Caller is not a participant", body = ErrorResponse)
    )
)]
pub async fn mark_as_delivered(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
    Json(body): Json<AcknowledgeBody>,
) -> Result<Json<DeliveredResponse>, ApiError> {
    let user_id = state.caller(&headers).await?;
    let selection = body.into_selection()?;
    let outcome = state
        .core()
        .delivery
        .mark_delivered(&conversation_id, user_id, selection)
        .await?;

    Ok(Json(outcome.into()))
}

#[utoipa::path(
    get,
    path = "/conversations/{conversation_id}/unread_count",
    tag = "Receipts",
    security(("bearerAuth" = [])),
    params(("conversation_id" = String, Path, description = "Conversation public ID")),
    responses(
        (status = 200, description = "Unread messages for the caller", body = UnreadCountResponse),
        (status = 403, description = "Caller is not a participant", body = ErrorResponse)
    )
)]
pub async fn unread_count(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let user_id = state.caller(&headers).await?;
    let unread_count = state
        .core()
        .unread
        .unread_count(&conversation_id, user_id)
        .await?;

    Ok(Json(UnreadCountResponse {
        conversation_id,
        unread_count,
    }))
}
