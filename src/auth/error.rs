use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced to callers of the auth endpoints. Internal causes are
/// logged where they occur and never carried into the response.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("User with that email already exists")]
    DuplicateEmail,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Invalid or expired token")]
    Unauthenticated,
    #[error("Something bad happened")]
    Persistence,
    #[error("Internal server error")]
    Internal,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::DuplicateEmail => StatusCode::CONFLICT,
            AuthError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::Persistence => StatusCode::BAD_GATEWAY,
            AuthError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "status": "fail", "message": self.to_string() }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            AuthError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AuthError::DuplicateEmail.status(), StatusCode::CONFLICT);
        assert_eq!(AuthError::InvalidCredentials.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::Persistence.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn persistence_message_is_opaque() {
        assert_eq!(AuthError::Persistence.to_string(), "Something bad happened");
    }
}
