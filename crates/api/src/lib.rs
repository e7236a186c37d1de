//! REST surface of the Relay messaging core.
//!
//! Every route authenticates the caller from `Authorization: Bearer <token>`
//! through the configured [`IdentityResolver`] and delegates to
//! [`relay_messaging::MessagingCore`]. Domain errors become JSON bodies of the
//! form `{"error": ..., "kind": ...}`.

mod docs;
mod error;
mod state;
mod util;

pub mod routes;

pub use docs::ApiDoc;
pub use error::{status_for, ApiError, ErrorResponse};
pub use state::{AppState, ForwardedUserId, IdentityResolver};

use axum::{
    http::header::{AUTHORIZATION, CONTENT_TYPE},
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        // Conversation routes
        .route(
            "/conversations",
            get(routes::conversations::list_conversations)
                .post(routes::conversations::create_conversation),
        )
        .route(
            "/conversations/:conversation_id",
            get(routes::conversations::get_conversation),
        )
        .route(
            "/conversations/:conversation_id/deactivate",
            post(routes::conversations::deactivate_conversation),
        )
        // Participant routes
        .route(
            "/conversations/:conversation_id/add_participants",
            post(routes::conversations::add_participants),
        )
        .route(
            "/conversations/:conversation_id/participants",
            get(routes::conversations::list_participants),
        )
        .route(
            "/conversations/:conversation_id/participants/:user_id",
            patch(routes::conversations::change_role),
        )
        .route(
            "/conversations/:conversation_id/leave",
            post(routes::conversations::leave_conversation),
        )
        .route(
            "/conversations/:conversation_id/mute",
            post(routes::conversations::set_muted),
        )
        // Receipt routes
        .route(
            "/conversations/:conversation_id/mark_as_read",
            post(routes::conversations::mark_as_read),
        )
        .route(
            "/conversations/:conversation_id/mark_as_delivered",
            post(routes::conversations::mark_as_delivered),
        )
        .route(
            "/conversations/:conversation_id/unread_count",
            get(routes::conversations::unread_count),
        )
        // Message routes
        .route(
            "/messages",
            get(routes::messages::list_messages).post(routes::messages::create_message),
        )
        .route(
            "/messages/:message_id",
            get(routes::messages::get_message).delete(routes::messages::delete_message),
        )
        .route(
            "/messages/:message_id/edit",
            patch(routes::messages::edit_message),
        )
        .route(
            "/messages/:message_id/receipts",
            get(routes::messages::list_receipts),
        )
        // Invitation routes
        .route(
            "/invitations",
            get(routes::invitations::list_invitations)
                .post(routes::invitations::create_invitation),
        )
        .route(
            "/invitations/:invitation_id",
            get(routes::invitations::get_invitation),
        )
        .route(
            "/invitations/:invitation_id/accept",
            post(routes::invitations::accept_invitation),
        )
        .route(
            "/invitations/:invitation_id/decline",
            post(routes::invitations::decline_invitation),
        )
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PATCH,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}
