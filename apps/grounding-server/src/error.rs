//! Error types for the grounding server

use agent_orchestrator::NormalizeError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared_pdf::PdfSourceError;
use thiserror::Error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("No extraction providers configured")]
    NoProviders,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ServerError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST", msg.clone())
            }
            ServerError::InvalidPdf(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_PDF",
                msg.clone(),
            ),
            ServerError::ProviderNotFound(id) => (
                StatusCode::NOT_FOUND,
                "PROVIDER_NOT_FOUND",
                format!("Provider '{}' is not configured", id),
            ),
            ServerError::NoProviders => (
                StatusCode::SERVICE_UNAVAILABLE,
                "NO_PROVIDERS",
                self.to_string(),
            ),
            ServerError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
            ),
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<PdfSourceError> for ServerError {
    fn from(err: PdfSourceError) -> Self {
        ServerError::InvalidPdf(err.to_string())
    }
}

impl From<NormalizeError> for ServerError {
    fn from(err: NormalizeError) -> Self {
        ServerError::InvalidRequest(err.to_string())
    }
}
