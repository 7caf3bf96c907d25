use tokio::task::JoinError;
use thiserror::Error;
use actix_web::{HttpResponse, ResponseError, http::StatusCode};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Walkdir error: {0}")]
    Walkdir(#[from] walkdir::Error),

    #[error("Tokio join error: {0}")]
    Join(#[from] JoinError),

    #[error("Multipart error: {0}")]
    Multipart(String),

    /// Bad or missing client input.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// The file was written but could not be found afterwards.
    #[error("{0}")]
    Storage(String),

    #[error("Error comparing images with the model service: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Model service returned {status}: {body}")]
    OracleStatus { status: u16, body: String },

    /// The model reply could not be turned into a result. `raw_response`
    /// is echoed to the caller for diagnosis.
    #[error("{message}")]
    Parse { message: String, raw_response: String },
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Parse { message, raw_response } => serde_json::json!({
                "error": message,
                "raw_response": raw_response,
            }),
            _ => serde_json::json!({
                "error": self.to_string(),
            }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Url(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Walkdir(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Multipart(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::OracleStatus { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Parse { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(e: actix_multipart::MultipartError) -> Self {
        AppError::Multipart(e.to_string())
    }
}
