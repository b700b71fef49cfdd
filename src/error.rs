use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Durable store failure. The registration it concerned was not recorded.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Failure to add one track to a user's playback queue.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("No Spotify account linked")]
    NotLinked,

    #[error("Queue request timed out")]
    Timeout,

    #[error("Queue request rejected: {status} - {body}")]
    Rejected { status: u16, body: String },

    #[error("Queue request failed: {0}")]
    Request(String),
}

/// Commit attempted on a draft that is not complete yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Registration incomplete (missing point: {missing_point}, missing track: {missing_track})")]
pub struct ValidationFailure {
    pub missing_point: bool,
    pub missing_track: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Incomplete(#[from] ValidationFailure),

    #[error("No registration in progress")]
    NoSession,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    BadInput(String),

    #[error("Spotify error: {0}")]
    Spotify(String),
}

impl AppError {
    /// Text the chat relay forwards to the user.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Incomplete(_) => "I need you to give me a location and a song!".to_string(),
            AppError::NoSession => "No transaction in progress!".to_string(),
            AppError::Queue(QueueError::NotLinked) => {
                "No spotify linked! Please log in again.".to_string()
            }
            AppError::Store(_) => "Couldn't save that right now, please try again.".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Incomplete(_) | AppError::BadInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NoSession => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Queue(QueueError::NotLinked) => StatusCode::PRECONDITION_FAILED,
            AppError::Queue(_) | AppError::Spotify(_) => StatusCode::BAD_GATEWAY,
            AppError::Store(e) => {
                tracing::error!("Store error: {:?}", e);
                StatusCode::SERVICE_UNAVAILABLE
            }
        };

        let mut body = json!({
            "error": self.to_string(),
            "message": self.user_message(),
        });
        if let AppError::Incomplete(failure) = &self {
            body["missingPoint"] = json!(failure.missing_point);
            body["missingTrack"] = json!(failure.missing_track);
        }

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
