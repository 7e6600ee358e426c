use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Required credential or identifier missing; never retried.
    Config(String),
    /// Malformed inbound payload, rejected before any network call.
    InvalidInput,
    /// Non-success response from the record store after the retry ceiling.
    Upstream {
        /// HTTP status returned by the store.
        status: u16,
        /// Response body text, reported verbatim.
        body: String,
    },
    /// Network-level fault (connection error, timeout) talking to the store.
    Network(String),
    /// Internal server error.
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::InvalidInput => write!(f, "INVALID_INPUT"),
            AppError::Upstream { status, body } => {
                write!(f, "Airtable request failed: {} {}", status, body)
            }
            AppError::Network(msg) => write!(f, "Network error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl AppError {
    /// True when the failure is the store telling us to slow down, either by
    /// status code or by a rate-limit message in the body.
    fn is_rate_limited(&self) -> bool {
        match self {
            AppError::Upstream { status, body } => {
                *status == 429 || body.to_lowercase().contains("rate limit")
            }
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Validation failures map to 400 with the fixed `INVALID_INPUT` code,
    /// rate limiting surfaces as 429, everything else as 500. The body shape
    /// is `{ok:false, error}` to match the form client's contract.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Config(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::InvalidInput => (StatusCode::BAD_REQUEST, "INVALID_INPUT".to_string()),
            AppError::Upstream { status, body } => {
                tracing::error!("Airtable request failed: {} {}", status, body);
                let code = if self.is_rate_limited() {
                    StatusCode::TOO_MANY_REQUESTS
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                (code, self.to_string())
            }
            AppError::Network(msg) => {
                tracing::error!("Network error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        let body = Json(json!({
            "ok": false,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    /// Converts a `reqwest::Error` into an `AppError`.
    ///
    /// Only network-level faults reach this path; HTTP-level failures are
    /// returned as responses by the transport and classified by the caller.
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}
