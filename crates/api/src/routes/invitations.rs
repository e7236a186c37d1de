use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use relay_messaging::InvitationFilter;

use crate::{
    error::ErrorResponse,
    routes::models::{
        CreateInvitationBody, InvitationResponse, InvitationsResponse, ListInvitationsParams,
    },
    ApiError, AppState,
};

#[utoipa::path(
    get,
    path = "/invitations",
    tag = "Invitations",
    security(("bearerAuth" = [])),
    params(ListInvitationsParams),
    responses(
        (status = 200, description = "Invitations addressed to the caller, or of one conversation", body = InvitationsResponse),
        (status = 403, description = "Caller may not see the conversation's invitations", body = ErrorResponse)
    )
)]
pub async fn list_invitations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListInvitationsParams>,
) -> Result<Json<InvitationsResponse>, ApiError> {
    let user_id = state.caller(&headers).await?;
    let filter = InvitationFilter {
        status: params.status,
    };

    let invitations = match params.conversation_id {
        Some(conversation_id) => {
            state
                .core()
                .invitations
                .list_for_conversation(&conversation_id, user_id, filter)
                .await?
        }
        None => {
            state
                .core()
                .invitations
                .list_for_user(user_id, filter)
                .await?
        }
    };

    Ok(Json(InvitationsResponse { invitations }))
}

#[utoipa::path(
    post,
    path = "/invitations",
    tag = "Invitations",
    security(("bearerAuth" = [])),
    request_body = CreateInvitationBody,
    responses(
        (status = 200, description = "Invitation created", body = InvitationResponse),
        (status = 403, description = "Caller is not an admin of the conversation", body = ErrorResponse),
        (status = 409, description = "Invitee already pending or already a participant", body = ErrorResponse),
        (status = 422, description = "Invitee is not an employee", body = ErrorResponse)
    )
)]
pub async fn create_invitation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateInvitationBody>,
) -> Result<Json<InvitationResponse>, ApiError> {
    let user_id = state.caller(&headers).await?;
    let (conversation_id, request) = body.into_request();
    let invitation = state
        .core()
        .invitations
        .create(&conversation_id, user_id, request)
        .await?;

    Ok(Json(InvitationResponse { invitation }))
}

#[utoipa::path(
    get,
    path = "/invitations/{invitation_id}",
    tag = "Invitations",
    security(("bearerAuth" = [])),
    params(("invitation_id" = String, Path, description = "Invitation public ID")),
    responses(
        (status = 200, description = "Invitation", body = InvitationResponse),
        (status = 404, description = "Invitation not found", body = ErrorResponse)
    )
)]
pub async fn get_invitation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(invitation_id): Path<String>,
) -> Result<Json<InvitationResponse>, ApiError> {
    let user_id = state.caller(&headers).await?;
    let invitation = state
        .core()
        .invitations
        .get(&invitation_id, user_id)
        .await?;

    Ok(Json(InvitationResponse { invitation }))
}

#[utoipa::path(
    post,
    path = "/invitations/{invitation_id}/accept",
    tag = "Invitations",
    security(("bearerAuth" = [])),
    params(("invitation_id" = String, Path, description = "Invitation public ID")),
    responses(
        (status = 200, description = "Invitation accepted; caller joined the conversation", body = InvitationResponse),
        (status = 403, description = "Caller is not the invitee", body = ErrorResponse),
        (status = 409, description = "Invitation is no longer pending or has expired", body = ErrorResponse)
    )
)]
pub async fn accept_invitation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(invitation_id): Path<String>,
) -> Result<Json<InvitationResponse>, ApiError> {
    let user_id = state.caller(&headers).await?;
    let invitation = state
        .core()
        .invitations
        .accept(&invitation_id, user_id)
        .await?;

    Ok(Json(InvitationResponse { invitation }))
}

#[utoipa::path(
    post,
    path = "/invitations/{invitation_id}/decline",
    tag = "Invitations",
    security(("bearerAuth" = [])),
    params(("invitation_id" = String, Path, description = "Invitation public ID")),
    responses(
        (status = 200, description = "Invitation declined", body = InvitationResponse),
        (status = 403, description = "Caller is not the invitee", body = ErrorResponse),
        (status = 409, description = "Invitation is no longer pending or has expired", body = ErrorResponse)
    )
)]
pub async fn decline_invitation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(invitation_id): Path<String>,
) -> Result<Json<InvitationResponse>, ApiError> {
    let user_id = state.caller(&headers).await?;
    let invitation = state
        .core()
        .invitations
        .decline(&invitation_id, user_id)
        .await?;

    Ok(Json(InvitationResponse { invitation }))
}
