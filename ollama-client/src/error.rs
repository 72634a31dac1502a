//! Error type for the Ollama client and helpers for mapping HTTP failures.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors from the Ollama client.
///
/// There is no abort variant: an aborted stream simply ends.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP or network request failed, including reads from an open stream.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Response {
        /// HTTP status code.
        status: u16,
        /// The `error` field of the body, or the raw body text.
        message: String,
    },

    /// Requested model does not exist on the server.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// A streamed record carried an `error` payload.
    #[error("{0}")]
    Upstream(String),

    /// The stream closed before a terminal record arrived.
    #[error("did not receive done or success response in stream")]
    IncompleteStream,

    /// Streaming was requested but the response had no body to read.
    #[error("missing body")]
    MissingBody,

    /// A buffered response body was not the expected JSON shape.
    #[error("invalid JSON response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured host could not be parsed.
    #[error("invalid host: {0}")]
    InvalidHost(String),

    /// A configured header name or value is not valid HTTP.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The request failed validation and was not sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Whether retrying this request might succeed.
    ///
    /// Classification only; the client itself never retries.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::IncompleteStream => true,
            Self::Response { status, .. } => *status == 429 || (500..=599).contains(status),
            _ => false,
        }
    }
}

/// Map a non-success HTTP status and its body to a [`ClientError`].
///
/// Ollama reports failures as `{"error": "..."}`; when the body is not that
/// shape the raw text is kept instead.
pub(crate) fn map_http_status(status: reqwest::StatusCode, body: &str) -> ClientError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"].as_str().map(str::to_string))
        .unwrap_or_else(|| {
            if body.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            } else {
                body.to_string()
            }
        });

    match status.as_u16() {
        404 => ClientError::ModelNotFound(message),
        code => ClientError::Response {
            status: code,
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_404_maps_to_model_not_found() {
        let err = map_http_status(
            reqwest::StatusCode::NOT_FOUND,
            r#"{"error":"model 'foo' not found"}"#,
        );
        assert!(matches!(err, ClientError::ModelNotFound(msg) if msg == "model 'foo' not found"));
    }

    #[test]
    fn error_field_is_extracted() {
        let err = map_http_status(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error":"invalid options"}"#,
        );
        match err {
            ClientError::Response { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "invalid options");
            }
            other => panic!("expected Response, got: {other:?}"),
        }
    }

    #[test]
    fn plain_text_body_is_kept() {
        let err = map_http_status(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert!(
            matches!(err, ClientError::Response { status: 502, ref message } if message == "upstream down")
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn empty_body_uses_reason_phrase() {
        let err = map_http_status(reqwest::StatusCode::SERVICE_UNAVAILABLE, "");
        assert!(
            matches!(err, ClientError::Response { ref message, .. } if message == "Service Unavailable")
        );
    }

    #[test]
    fn client_errors_are_not_retryable() {
        assert!(!map_http_status(reqwest::StatusCode::BAD_REQUEST, "bad").is_retryable());
        assert!(!ClientError::Upstream("boom".into()).is_retryable());
        assert!(!ClientError::MissingBody.is_retryable());
        assert!(!ClientError::InvalidRequest("query is required".into()).is_retryable());
        assert!(ClientError::IncompleteStream.is_retryable());
    }

    #[test]
    fn display_messages() {
        assert_eq!(ClientError::MissingBody.to_string(), "missing body");
        assert_eq!(
            ClientError::Upstream("model not found".into()).to_string(),
            "model not found"
        );
        assert_eq!(
            ClientError::Response {
                status: 500,
                message: "oops".into()
            }
            .to_string(),
            "HTTP 500: oops"
        );
    }
}
