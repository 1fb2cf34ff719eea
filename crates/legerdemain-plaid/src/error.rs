//! Client error types.
//!
//! [`PlaidError`] is returned by every fallible call in this crate. API
//! failures keep the provider's [`ApiErrorPayload`] intact so that callers
//! can classify them.

use legerdemain_models::{ApiErrorPayload, ModelError};

/// Maximum length of a response body quoted in an error message.
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error type for all client operations.
#[derive(Debug, thiserror::Error)]
pub enum PlaidError {
    /// Invalid or missing configuration (unknown environment, bad URL).
    #[error("configuration error: {0}")]
    Config(String),

    /// The API answered with a well-formed error payload.
    #[error("API error (HTTP {status}): {payload}")]
    Api {
        /// HTTP status of the response.
        status: u16,
        /// Decoded error body.
        payload: ApiErrorPayload,
    },

    /// The API answered with something that is not a known shape.
    #[error("unexpected response (HTTP {status}): {body}")]
    UnexpectedResponse {
        /// HTTP status of the response.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization / deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<ModelError> for PlaidError {
    fn from(e: ModelError) -> Self {
        PlaidError::Config(e.to_string())
    }
}

impl PlaidError {
    /// The provider's error payload, when the failure carried one.
    pub fn api_payload(&self) -> Option<&ApiErrorPayload> {
        match self {
            Self::Api { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// Build an [`UnexpectedResponse`](Self::UnexpectedResponse), truncating
    /// the body so error messages stay readable.
    pub fn unexpected(status: u16, body: &str) -> Self {
        let body = if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        };
        Self::UnexpectedResponse { status, body }
    }
}
