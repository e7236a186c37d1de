use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use relay_messaging::{ErrorKind, MessagingError};
use serde::Serialize;
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Stable machine-readable error kind, e.g. `not_a_participant`.
    pub kind: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorKind::Validation.as_str(), message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorKind::NotFound.as_str(), message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Internal.as_str(),
            message,
        )
    }
}

/// HTTP status for each domain error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotAParticipant | ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::DuplicateInvitation
        | ErrorKind::AlreadyParticipant
        | ErrorKind::InvalidState => StatusCode::CONFLICT,
        ErrorKind::InvalidParticipant
        | ErrorKind::EmptyParticipants
        | ErrorKind::InvalidReplyTarget => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
            kind: self.kind.to_string(),
        });
        (self.status, body).into_response()
    }
}

impl From<MessagingError> for ApiError {
    fn from(error: MessagingError) -> Self {
        let kind = error.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            error!(error = ?error, "messaging request failed");
            return Self::internal_server_error("internal server error");
        }
        debug!(kind = %kind, error = %error, "messaging request rejected");
        Self::new(status, kind.as_str(), error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_semantic_statuses() {
        let cases = [
            (MessagingError::not_a_participant("c", 1), StatusCode::FORBIDDEN),
            (MessagingError::forbidden("admins only"), StatusCode::FORBIDDEN),
            (MessagingError::not_found("message", "m"), StatusCode::NOT_FOUND),
            (MessagingError::EmptyParticipants, StatusCode::UNPROCESSABLE_ENTITY),
            (
                MessagingError::DuplicateInvitation { user_id: 3 },
                StatusCode::CONFLICT,
            ),
            (MessagingError::invalid_state("final"), StatusCode::CONFLICT),
            (MessagingError::validation("empty"), StatusCode::BAD_REQUEST),
        ];

        for (error, expected) in cases {
            let kind = error.kind();
            let api_error: ApiError = error.into();
            assert_eq!(api_error.status, expected, "unexpected status for {kind}");
            assert_eq!(api_error.kind, kind.as_str());
        }
    }
}
