use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::{error, warn};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ErrorType {
    #[error("No image provided")]
    MissingImage,
    #[error("Uploaded file is not a supported image: {0}")]
    InvalidImage(String),
    #[error("Invalid media name: {0:?}")]
    InvalidName(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Upload exceeds the size limit")]
    TooLarge,
    #[error("Entry Not Found")]
    NotFound,
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid augmentation parameters: {0}")]
    InvalidParams(String),
    #[error("Worker thread failed: {0}")]
    WorkerFailed(String),
}

impl ErrorType {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorType::MissingImage | ErrorType::InvalidImage(_) | ErrorType::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ErrorType::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            // traversal attempts look exactly like a missing file
            ErrorType::InvalidName(_) | ErrorType::NotFound => StatusCode::NOT_FOUND,
            ErrorType::Io(_)
            | ErrorType::Image(_)
            | ErrorType::InvalidParams(_)
            | ErrorType::WorkerFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message sent to the client. Internal causes stay in the log.
    pub fn public_message(&self) -> String {
        match self {
            ErrorType::InvalidName(_) | ErrorType::NotFound => "File not found".into(),
            ErrorType::Io(_)
            | ErrorType::Image(_)
            | ErrorType::InvalidParams(_)
            | ErrorType::WorkerFailed(_) => "Internal server error".into(),
            other => other.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for ErrorType {
    fn from(e: tokio::task::JoinError) -> Self {
        ErrorType::WorkerFailed(e.to_string())
    }
}

impl IntoResponse for ErrorType {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!("{}", self);
        } else {
            warn!("{}", self);
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}
