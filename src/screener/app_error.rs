use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Deserialize, Serialize, Debug)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub request_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppErrorCode {
    BadRequest,
    InvalidDemoRequest,
    NotFound,
    InternalError,
}

impl AppErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppErrorCode::BadRequest => "BadRequest",
            AppErrorCode::InvalidDemoRequest => "InvalidDemoRequest",
            AppErrorCode::NotFound => "NotFound",
            AppErrorCode::InternalError => "InternalError",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            AppErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            AppErrorCode::InvalidDemoRequest => StatusCode::BAD_REQUEST,
            AppErrorCode::NotFound => StatusCode::NOT_FOUND,
            AppErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            AppErrorCode::BadRequest => "The request body is not valid.",
            AppErrorCode::InvalidDemoRequest => "Invalid demo request",
            AppErrorCode::NotFound => "The requested resource does not exist.",
            AppErrorCode::InternalError => "We encountered an internal error. Please try again.",
        }
    }
}

/// Error returned by route handlers once a request is authenticated.
#[derive(Debug)]
pub struct AppError {
    pub code: AppErrorCode,
    pub message: Option<String>,
}

impl AppError {
    pub fn new(code: AppErrorCode) -> Self {
        Self {
            code,
            message: None,
        }
    }

    pub fn with_message(code: AppErrorCode, message: String) -> Self {
        Self {
            code,
            message: Some(message),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self::with_message(AppErrorCode::BadRequest, message.to_string())
    }

    pub fn invalid_demo_request() -> Self {
        Self::new(AppErrorCode::InvalidDemoRequest)
    }

    pub fn not_found() -> Self {
        Self::new(AppErrorCode::NotFound)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::with_message(AppErrorCode::InternalError, message.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code.as_str().to_string(),
            message: self
                .message
                .unwrap_or_else(|| self.code.default_message().to_string()),
            request_id: Uuid::new_v4().to_string(),
        };

        (self.code.http_status(), Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(),
            _ => Self::internal_error(&err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::bad_request(&err.to_string())
    }
}
