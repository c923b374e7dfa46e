use crate::db::errors::DbError;
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but missing, invalid, or no longer honored
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Login or current-password verification failed. Deliberately carries no
    /// hint of whether the email or the password was the wrong half.
    #[error("Invalid credentials")]
    InvalidCredentials { message: Option<String> },

    /// Authenticated user lacks the role required for the operation
    #[error("Insufficient permissions")]
    Forbidden,

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Password reset ticket did not match any account or was past its expiry
    #[error("Password reset ticket invalid or expired")]
    TokenInvalidOrExpired,

    /// Requested resource not found
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// The password reset email could not be handed to the transport
    #[error("Email delivery failed")]
    EmailDeliveryFailed,

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::InvalidCredentials { .. } => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::TokenInvalidOrExpired => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::EmailDeliveryFailed => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message
                .clone()
                .unwrap_or_else(|| "You are not logged in! Please log in to get access".to_string()),
            Error::InvalidCredentials { message } => message.clone().unwrap_or_else(|| "Incorrect email or password".to_string()),
            Error::Forbidden => "You do not have permission to perform this action".to_string(),
            Error::BadRequest { message } => message.clone(),
            Error::TokenInvalidOrExpired => "Token is invalid or has expired".to_string(),
            Error::NotFound { resource, .. } => match resource.as_str() {
                // Reset requests answer in terms of the email that was posted;
                // everything else is an id lookup.
                "email" => "There is no user with this email address".to_string(),
                _ => "No document found with that ID".to_string(),
            },
            Error::EmailDeliveryFailed => "There was an error sending the email. Try again later".to_string(),
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "No document found with that ID".to_string(),
                DbError::UniqueViolation { .. } if db_err.violates("users.email") => {
                    "An account with this email address already exists".to_string()
                }
                DbError::UniqueViolation { .. } => "Resource already exists".to_string(),
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) | Error::EmailDeliveryFailed => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. } | Error::InvalidCredentials { .. } | Error::Forbidden => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } | Error::TokenInvalidOrExpired => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();

        // 4xx is the caller's fault, 5xx is ours; clients branch on this field
        let label = if status.is_server_error() { "error" } else { "fail" };
        let body = Json(json!({
            "status": label,
            "message": self.user_message(),
        }));

        (status, body).into_response()
    }
}

// Extractor rejections funnel through [`Error`] (via the wrappers in
// [`crate::api::extractors`]) so a bad body or path answers the same
// status/message envelope as every other failure.

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        // Unreadable, syntactically broken, and schema-mismatched bodies all
        // land on 400; axum's message already names the offending field
        Error::BadRequest {
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        match rejection {
            PathRejection::FailedToDeserializePathParams(inner) => Error::BadRequest {
                message: inner.body_text(),
            },
            // Missing params mean the route table and handler signature
            // disagree, which is our bug, not the caller's
            other => Error::Internal {
                operation: format!("extract path parameters: {other}"),
            },
        }
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::BadRequest {
            message: rejection.body_text(),
        }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(Error::Unauthenticated { message: None }.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::InvalidCredentials { message: None }.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(Error::TokenInvalidOrExpired.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::NotFound {
                resource: "post".to_string(),
                id: "abc".to_string()
            }
            .status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(Error::EmailDeliveryFailed.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(Error::Database(DbError::NotFound).status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn credential_failures_share_one_message() {
        // Unknown email and wrong password must be indistinguishable
        let unknown_email = Error::InvalidCredentials { message: None };
        let wrong_password = Error::InvalidCredentials { message: None };
        assert_eq!(unknown_email.user_message(), wrong_password.user_message());
        assert_eq!(unknown_email.user_message(), "Incorrect email or password");
    }

    #[test]
    fn duplicate_email_maps_to_conflict_with_friendly_message() {
        let err = Error::Database(DbError::UniqueViolation {
            constraint: None,
            message: "UNIQUE constraint failed: users.email".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.user_message(), "An account with this email address already exists");
    }

    #[test]
    fn internal_details_never_reach_the_user() {
        let err = Error::Internal {
            operation: "connect to smtp relay at 10.0.0.3".to_string(),
        };
        assert_eq!(err.user_message(), "Internal server error");
    }
}
