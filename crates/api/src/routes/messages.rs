use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use relay_messaging::ListMessagesQuery;

use crate::{
    error::ErrorResponse,
    routes::models::{
        EditMessageBody, ListMessagesParams, MessageResponse, MessagesResponse, PostMessageBody,
        ReceiptsResponse,
    },
    ApiError, AppState,
};

#[utoipa::path(
    get,
    path = "/messages",
    tag = "Messages",
    security(("bearerAuth" = [])),
    params(ListMessagesParams),
    responses(
        (status = 200, description = "Page of messages, newest first", body = MessagesResponse),
        (status = 400, description = "Invalid paging parameters", body = ErrorResponse),
        (status = 403, description = "Caller is not a participant", body = ErrorResponse),
        (status = 404, description = "Conversation not found", body = ErrorResponse)
    )
)]
pub async fn list_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListMessagesParams>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let user_id = state.caller(&headers).await?;
    let query = ListMessagesQuery {
        limit: params.limit,
        offset: params.offset,
        include_deleted: params.include_deleted,
    };
    let page = state
        .core()
        .messages
        .list(&params.conversation_id, user_id, query)
        .await?;

    Ok(Json(MessagesResponse {
        messages: page.messages,
        limit: page.limit,
        offset: page.offset,
    }))
}

#[utoipa::path(
    post,
    path = "/messages",
    tag = "Messages",
    security(("bearerAuth" = [])),
    request_body = PostMessageBody,
    responses(
        (status = 200, description = "Message appended", body = MessageResponse),
        (status = 400, description = "Empty or oversized content", body = ErrorResponse),
        (status = 403, description = "Caller is not a participant", body = ErrorResponse),
        (status = 422, description = "Reply target missing, deleted or in another conversation", body = ErrorResponse)
    )
)]
pub async fn create_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<PostMessageBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user_id = state.caller(&headers).await?;
    let (conversation_id, request) = body.into_request();
    let message = state
        .core()
        .messages
        .append(&conversation_id, user_id, request)
        .await?;

    Ok(Json(MessageResponse { message }))
}

#[utoipa::path(
    get,
    path = "/messages/{message_id}",
    tag = "Messages",
    security(("bearerAuth" = [])),
    params(("message_id" = String, Path, description = "Message public ID")),
    responses(
        (status = 200, description = "Message", body = MessageResponse),
        (status = 403, description = "Caller is not a participant", body = ErrorResponse),
        (status = 404, description = "Message not found", body = ErrorResponse)
    )
)]
pub async fn get_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(message_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user_id = state.caller(&headers).await?;
    let message = state.core().messages.get(&message_id, user_id).await?;

    Ok(Json(MessageResponse { message }))
}

#[utoipa::path(
    patch,
    path = "/messages/{message_id}/edit",
    tag = "Messages",
    security(("bearerAuth" = [])),
    params(("message_id" = String, Path, description = "Message public ID")),
    request_body = EditMessageBody,
    responses(
        (status = 200, description = "Message edited", body = MessageResponse),
        (status = 403, description = "Only the sender may edit", body = ErrorResponse),
        (status = 404, description = "Message not found or deleted", body = ErrorResponse)
    )
)]
pub async fn edit_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(message_id): Path<String>,
    Json(body): Json<EditMessageBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user_id = state.caller(&headers).await?;
    let message = state
        .core()
        .messages
        .edit(&message_id, user_id, &body.content)
        .await?;

    Ok(Json(MessageResponse { message }))
}

#[utoipa::path(
    delete,
    path = "/messages/{message_id}",
    tag = "Messages",
    security(("bearerAuth" = [])),
    params(("message_id" = String, Path, description = "Message public ID")),
    responses(
        (status = 200, description = "Message soft-deleted; the tombstone is returned", body = MessageResponse),
        (status = 403, description = "Only the sender may delete", body = ErrorResponse),
        (status = 404, description = "Message not found or already deleted", body = ErrorResponse)
    )
)]
pub async fn delete_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(message_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user_id = state.caller(&headers).await?;
    let message = state
        .core()
        .messages
        .soft_delete(&message_id, user_id)
        .await?;

    Ok(Json(MessageResponse { message }))
}

#[utoipa::path(
    get,
    path = "/messages/{message_id}/receipts",
    tag = "Receipts",
    security(("bearerAuth" = [])),
    params(("message_id" = String, Path, description = "Message public ID")),
    responses(
        (status = 200, description = "Per-recipient delivery status", body = ReceiptsResponse),
        (status = 403, description = "Caller is not a participant", body = ErrorResponse),
        (status = 404, description = "Message not found", body = ErrorResponse)
    )
)]
pub async fn list_receipts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(message_id): Path<String>,
) -> Result<Json<ReceiptsResponse>, ApiError> {
    let user_id = state.caller(&headers).await?;
    let receipts = state.core().delivery.receipts(&message_id, user_id).await?;

    Ok(Json(ReceiptsResponse { receipts }))
}
