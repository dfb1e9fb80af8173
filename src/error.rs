//! Error types for the feedback analyzer.
//!
//! Library code returns [`FeedbackError`]; handlers let it bubble up to
//! actix-web, which renders it through the [`ResponseError`] impl below.

use actix_web::http::{header::ContentType, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::pages;

/// A submitted form that cannot be stored. The message is shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored row that no longer satisfies the record invariants
    #[error("Invalid stored record: {0}")]
    InvalidRecord(String),

    #[error("Gemini API error: {0}")]
    ModelApi(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FeedbackError>;

impl ResponseError for FeedbackError {
    fn status_code(&self) -> StatusCode {
        match self {
            FeedbackError::Validation(_) => StatusCode::BAD_REQUEST,
            FeedbackError::ModelApi(_) | FeedbackError::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "Request failed: {}", self);
        }

        HttpResponse::build(status)
            .insert_header(ContentType::html())
            .body(pages::render_error_page(status, &self.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_client_errors() {
        let err = FeedbackError::from(ValidationError("Please fill subject and comments.".into()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Please fill subject and comments.");
    }

    #[test]
    fn model_failures_map_to_bad_gateway() {
        let err = FeedbackError::ModelApi("status 503".into());
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn storage_failures_map_to_internal_error() {
        let err = FeedbackError::InvalidRecord("rating 9".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
