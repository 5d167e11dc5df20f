use crate::models::ValidationIssue;
use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum QuizError {
    #[error("malformed question bank: {message}")]
    MalformedBank {
        message: String,
        issues: Vec<ValidationIssue>,
    },
    #[error("not enough questions: requested {requested}, available {available}")]
    InsufficientQuestions { requested: usize, available: usize },
    #[error("unknown subject `{key}`")]
    UnknownSubject { key: String, valid: Vec<String> },
    #[error("invalid test size {requested}, allowed 1..={max}")]
    InvalidTestSize { requested: usize, max: usize },
}

impl QuizError {
    pub fn malformed(message: impl Into<String>, issues: Vec<ValidationIssue>) -> Self {
        Self::MalformedBank {
            message: message.into(),
            issues,
        }
    }

    /// Text sent back to the channel that issued the failing request.
    pub fn user_message(&self) -> String {
        match self {
            QuizError::MalformedBank { .. } => "Question bank is unavailable right now.".to_string(),
            QuizError::InsufficientQuestions { requested, available } => format!(
                "Not enough questions in database. Requested {requested}, available {available}."
            ),
            QuizError::UnknownSubject { key, valid } if valid.is_empty() => {
                format!("Unknown subject \"{key}\". No subjects are configured.")
            }
            QuizError::UnknownSubject { key, valid } => {
                format!("Unknown subject \"{key}\". Valid subjects: {}", valid.join(", "))
            }
            QuizError::InvalidTestSize { max, .. } => {
                format!("Test size must be between 1 and {max}.")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub field: String,
    pub issue: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: ErrorPayload,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ErrorDetail>,
    pub request_id: String,
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: Vec<ErrorDetail>,
    pub request_id: String,
}

impl AppError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: Vec::new(),
            request_id: request_id.into(),
        }
    }

    pub fn with_details(mut self, details: Vec<ErrorDetail>) -> Self {
        self.details = details;
        self
    }

    pub fn from_quiz(err: QuizError, request_id: impl Into<String>) -> Self {
        let (status, code) = match &err {
            QuizError::MalformedBank { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "MALFORMED_BANK"),
            QuizError::InsufficientQuestions { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_QUESTIONS"),
            QuizError::UnknownSubject { .. } => (StatusCode::NOT_FOUND, "UNKNOWN_SUBJECT"),
            QuizError::InvalidTestSize { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        };
        let details = match &err {
            QuizError::MalformedBank { issues, .. } => issues
                .iter()
                .map(|i| ErrorDetail {
                    field: i.field.clone(),
                    issue: i.issue.clone(),
                })
                .collect(),
            _ => Vec::new(),
        };
        Self::new(status, code, err.user_message(), request_id).with_details(details)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let payload = ErrorBody {
            error: ErrorPayload {
                code: self.code,
                message: self.message,
                details: self.details,
                request_id: self.request_id,
            },
        };
        (self.status, Json(payload)).into_response()
    }
}
