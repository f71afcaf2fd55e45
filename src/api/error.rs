//! Errors surfaced by the delivery API client.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// The API reports failures as `{"error": "..."}`; anything else is passed
/// through with its status line.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Server rejected the request and said why.
    #[error("{message}")]
    Api { status: StatusCode, message: String },

    /// Token missing, expired or revoked.
    #[error("not signed in or session expired; run `tawseel login`")]
    Unauthorized,

    /// Transport or response-decoding failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: String,
}

impl ApiError {
    /// Build an error from a non-success response, preferring the API's own
    /// message over the bare status line.
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        ApiError::Api {
            status,
            message: message_from_body(status, &body),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            ApiError::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            ApiError::Http(_) => None,
        }
    }
}

fn message_from_body(status: StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return envelope.error;
    }
    if body.trim().is_empty() {
        format!("server returned HTTP {status}")
    } else {
        format!("server returned HTTP {status}: {body}")
    }
}
