use rocket::http::Status;
use rocket::response::{self, Responder, Response};
use rocket::serde::json::Json;
use rocket::Request;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Media host error ({status}): {message}")]
    MediaHost { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No file uploaded")]
    MissingFile,

    #[error("Upload exceeds the size limit")]
    PayloadTooLarge,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Queue is empty")]
    EmptyQueue,

    #[error("Track index {index} out of range for queue of {len}")]
    InvalidIndex { index: usize, len: usize },

    #[error("No track loaded")]
    NoTrack,

    #[error("Audio playback error: {0}")]
    Playback(String),

    #[error("Internal server error")]
    Internal,
}

impl AppError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        AppError::NotFound(format!("{}/{}", collection, id))
    }

    pub fn status(&self) -> Status {
        match self {
            AppError::NotFound(_) => Status::NotFound,
            AppError::MissingFile | AppError::Validation(_) => Status::BadRequest,
            AppError::PayloadTooLarge => Status::PayloadTooLarge,
            AppError::Serialization(_) => Status::UnprocessableEntity,
            AppError::PermissionDenied(_) => Status::Forbidden,
            AppError::EmptyQueue | AppError::InvalidIndex { .. } | AppError::NoTrack => {
                Status::Conflict
            }
            AppError::Http(_) | AppError::MediaHost { .. } => Status::BadGateway,
            AppError::Io(_) | AppError::Playback(_) | AppError::Internal => {
                Status::InternalServerError
            }
        }
    }
}

impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        if status.code >= 500 {
            log::error!("{} {} failed: {}", req.method(), req.uri(), self);
        }

        // Server-side details stay in the log
        let message = match status.code {
            500 => "Internal error".to_string(),
            _ => self.to_string(),
        };

        Response::build_from(Json(serde_json::json!({ "error": message })).respond_to(req)?)
            .status(status)
            .ok()
    }
}
