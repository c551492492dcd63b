use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::models::ListingStatus;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Role or ownership mismatch. Identity is verified upstream, so this
    /// always renders as 403.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The entity is not in a status that admits the requested transition.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Actor acting on their own listing as claimant, or a swap proposed
    /// to oneself.
    #[error("Self reference: {0}")]
    SelfReference(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    /// Someone else won the claim race. A normal business outcome, not a
    /// validation failure; carries the status that now holds on the listing.
    #[error("Claim lost: listing is now {status}")]
    ClaimLost { status: ListingStatus },

    /// The shift reference refused or failed the reassignment. The approval
    /// has been rolled back and the manager should retry.
    #[error("Reassignment failed: {0}")]
    ReassignmentFailed(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::InvalidState(msg) => (StatusCode::CONFLICT, msg),
            AppError::SelfReference(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ClaimLost { status } => {
                let body = Json(json!({
                    "error": "someone else already took this shift",
                    "status": status,
                }));
                return (StatusCode::CONFLICT, body).into_response();
            }
            AppError::ReassignmentFailed(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Database(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
