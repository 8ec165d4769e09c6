use std::fmt::Display;

use reqwest::StatusCode;
use serde::Deserialize;

/// Category of a failure, derived from the HTTP status or the transport error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed input caught before anything was sent
    Validation,
    /// Missing or rejected credentials; the viewer must sign in again
    Unauthorized,
    /// The entity does not exist (any more)
    NotFound,
    /// Generic remote failure (conflict, forbidden, server error, bad payload)
    RequestFailed,
    /// The server could not be reached at all
    NetworkUnavailable,
}

impl Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Unauthorized => "unauthorized",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::RequestFailed => "request_failed",
            ErrorCategory::NetworkUnavailable => "network_unavailable",
        };
        write!(f, "{}", name)
    }
}

/// Application-level errors
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Unauthorized{}", suffix(.0))]
    Unauthorized(Option<String>),

    #[error("Not found{}", suffix(.0))]
    NotFound(Option<String>),

    #[error("Request failed with status {}{}", status_text(.status), suffix(.message))]
    RequestFailed {
        status: Option<u16>,
        message: Option<String>,
    },

    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),
}

fn status_text(status: &Option<u16>) -> String {
    status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "n/a".to_string())
}

fn suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {}", m))
        .unwrap_or_default()
}

/// Error body returned by the API (`{"message": "..."}` or `{"error": "..."}`)
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl AppError {
    /// Builds an error from a non-success response status and its raw body
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = extract_message(body);

        match status {
            StatusCode::UNAUTHORIZED => AppError::Unauthorized(message),
            StatusCode::NOT_FOUND => AppError::NotFound(message),
            _ => AppError::RequestFailed {
                status: Some(status.as_u16()),
                message,
            },
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::Validation(_) => ErrorCategory::Validation,
            AppError::Unauthorized(_) => ErrorCategory::Unauthorized,
            AppError::NotFound(_) => ErrorCategory::NotFound,
            AppError::RequestFailed { .. } => ErrorCategory::RequestFailed,
            AppError::NetworkUnavailable(_) => ErrorCategory::NetworkUnavailable,
        }
    }

    /// Whether an optimistic local change must be reverted after this error
    ///
    /// Validation errors are raised before any local mutation happens.
    pub fn requires_rollback(&self) -> bool {
        !matches!(self, AppError::Validation(_))
    }

    /// Message from the server body, surfaced verbatim to the user
    pub fn server_message(&self) -> Option<&str> {
        match self {
            AppError::Unauthorized(message)
            | AppError::NotFound(message)
            | AppError::RequestFailed { message, .. } => message.as_deref(),
            AppError::Validation(_) | AppError::NetworkUnavailable(_) => None,
        }
    }

    /// Text to show in a notification, preferring the server's own message
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            AppError::Validation(message) => message.clone(),
            _ => self
                .server_message()
                .map(str::to_string)
                .unwrap_or_else(|| fallback.to_string()),
        }
    }
}

fn extract_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<ErrorBody>(trimmed) {
        Ok(parsed) => parsed.message.or(parsed.error),
        Err(_) => None,
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AppError::RequestFailed {
                status: e.status().map(|s| s.as_u16()),
                message: Some(format!("Failed to parse response: {}", e)),
            }
        } else if let Some(status) = e.status() {
            AppError::from_response(status, "")
        } else {
            AppError::NetworkUnavailable(e.to_string())
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
