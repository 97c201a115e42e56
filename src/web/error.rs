//! Server error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::api::ErrorResponse;
use crate::scan::ScanError;

/// Errors that can occur while running the HTTP server.
#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("Failed to bind to {address}: {source}")]
    BindError {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The server stopped with an I/O error.
    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// A scan error rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub ScanError);

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// HTTP status and client-visible message for this error.
    #[must_use]
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match &self.0 {
            ScanError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ScanError::NotFound(_) => (StatusCode::NOT_FOUND, "Invalid scan id".to_string()),
            ScanError::SpawnFailure { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if self.0.is_client_error() {
            tracing::debug!(error = %self.0, "Request rejected");
        } else {
            tracing::error!(error = %self.0, "Request failed");
        }
        (status, Json(ErrorResponse::new(message))).into_response()
    }
}
