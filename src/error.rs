// src/error.rs
use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::{json, Value};
use tracing::error;

use crate::services::{FetchError, IngestError};
use crate::store::StoreError;

#[derive(Debug)]
pub enum AppError {
    Store(StoreError),
    Fetch(FetchError),
    NotFound(String),
    ValidationError(String),
    /// Carries the already-registered record so clients can use it directly.
    Conflict { message: String, existing: Option<Value> },
    Cancelled,
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }

    pub fn conflict(msg: impl Into<String>, existing: Option<Value>) -> Self {
        AppError::Conflict { message: msg.into(), existing }
    }
}

fn problem(status: StatusCode, message: &str) -> Value {
    json!({
        "status": status.as_u16(),
        "error": status.canonical_reason().unwrap_or("Error"),
        "message": message,
    })
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Store(e) => {
                error!(error = %e, "Store error");
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                (status, problem(status, "Database error occurred"))
            }
            AppError::Fetch(e) => {
                let status = match &e {
                    FetchError::Configuration { .. } | FetchError::Parse(_) => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    FetchError::Transport { .. } | FetchError::Status { .. } => {
                        StatusCode::BAD_GATEWAY
                    }
                    FetchError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                };
                (status, problem(status, &e.to_string()))
            }
            AppError::NotFound(msg) => {
                let status = StatusCode::NOT_FOUND;
                (status, problem(status, &msg))
            }
            AppError::ValidationError(msg) => {
                let status = StatusCode::BAD_REQUEST;
                (status, problem(status, &msg))
            }
            AppError::Conflict { message, existing } => {
                let status = StatusCode::CONFLICT;
                let mut body = problem(status, &message);
                if let (Some(existing), Some(obj)) = (existing, body.as_object_mut()) {
                    obj.insert("existing".to_string(), existing);
                }
                (status, body)
            }
            AppError::Cancelled => {
                let status = StatusCode::SERVICE_UNAVAILABLE;
                (status, problem(status, "Request cancelled by shutdown"))
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => AppError::conflict(msg, None),
            StoreError::NotFound(msg) => AppError::not_found(msg),
            StoreError::Cancelled => AppError::Cancelled,
            other => AppError::Store(other),
        }
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        AppError::Fetch(err)
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Fetch(e) => e.into(),
            IngestError::Store(e) => e.into(),
            IngestError::Cancelled => AppError::Cancelled,
        }
    }
}
