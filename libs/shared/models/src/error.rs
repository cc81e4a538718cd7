use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error body returned to clients. Validation failures carry the per-field
/// messages alongside the joined summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub validation_errors: BTreeMap<String, Vec<String>>,
}

impl ErrorMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            validation_errors: BTreeMap::new(),
        }
    }

    /// Builds the summary from the field errors as `"Login can't be blank;Email is invalid"`.
    pub fn from_validation(validation_errors: BTreeMap<String, Vec<String>>) -> Self {
        let message = validation_errors
            .iter()
            .flat_map(|(field, messages)| {
                messages
                    .iter()
                    .map(move |msg| format!("{} {}", humanize(field), msg))
            })
            .collect::<Vec<_>>()
            .join(";");

        Self {
            message,
            validation_errors,
        }
    }
}

fn humanize(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Validation error: {}", .0.message)]
    Validation(ErrorMessage),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not Acceptable: {0}")]
    NotAcceptable(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("External service error: {0}")]
    ExternalService(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
            AppError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            AppError::Internal(_)
            | AppError::Database(_)
            | AppError::ExternalService(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorMessage {
        match self {
            AppError::Validation(message) => message.clone(),
            AppError::Auth(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Conflict(msg)
            | AppError::NotAcceptable(msg)
            | AppError::Timeout(msg)
            | AppError::Internal(msg)
            | AppError::Database(msg)
            | AppError::ExternalService(msg) => ErrorMessage::new(msg.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.body();

        tracing::error!("Error: {}: {}", status, body.message);

        (status, Json(body)).into_response()
    }
}
