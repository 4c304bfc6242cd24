//! Error types for the financial analyst pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by an LLM or embedding backend
#[derive(Debug, Error)]
pub enum LlmError {
    /// Credential rejected (HTTP 401/403)
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Quota exhausted (HTTP 429)
    #[error("rate limited by {provider}")]
    RateLimited {
        provider: &'static str,
        /// Server-provided `Retry-After` in seconds
        retry_after_secs: Option<u64>,
    },

    /// Connection-level failure
    #[error("network error: {0}")]
    Network(String),

    /// Request exceeded the configured timeout
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Any other non-success HTTP status
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Successful response without usable content
    #[error("empty response from {provider}")]
    EmptyResponse { provider: &'static str },

    /// Response body did not match the expected schema
    #[error("failed to parse response: {0}")]
    Parse(String),
}

impl LlmError {
    /// Rate limits, network failures, timeouts and 5xx responses are worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Network(_) | Self::Timeout { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Classify a transport error from reqwest
    pub fn from_transport(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout { secs: timeout_secs }
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }

    /// Classify a non-success HTTP status
    pub fn from_status(
        provider: &'static str,
        status: u16,
        body: String,
        retry_after_secs: Option<u64>,
    ) -> Self {
        match status {
            401 | 403 => Self::Auth(body),
            429 => Self::RateLimited {
                provider,
                retry_after_secs,
            },
            _ => Self::Api { status, body },
        }
    }
}

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid configuration / credential
    #[error("Configuration error: {0}")]
    Config(String),

    /// PDF could not be converted
    #[error("Failed to extract '{filename}': {message}")]
    Extraction { filename: String, message: String },

    /// Upload is not a PDF
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Embedding or index build failure
    #[error("Indexing failed: {0}")]
    Indexing(String),

    /// LLM call failure
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Query embedding failed before the LLM was called
    #[error("Retrieval failed: {0}")]
    Retrieval(#[source] LlmError),

    /// Malformed prompt template
    #[error("Invalid prompt template: {0}")]
    Prompt(String),

    /// Ask issued before a document was processed
    #[error("No document has been processed for this session")]
    NotReady,

    /// Empty or whitespace-only question
    #[error("Question must not be empty")]
    InvalidQuestion,

    /// Unknown session id
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Malformed upload request
    #[error("Invalid upload: {0}")]
    Upload(String),

    /// Upload body exceeded the configured size limit
    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),

    /// Too many live sessions, none of them idle
    #[error("Session limit reached ({0} active sessions)")]
    SessionLimit(usize),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an extraction error
    pub fn extraction(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an indexing error
    pub fn indexing(message: impl Into<String>) -> Self {
        Self::Indexing(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Stable machine-readable label used in API responses
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config_error",
            Error::Extraction { .. } => "extraction_error",
            Error::UnsupportedFileType(_) => "unsupported_type",
            Error::Indexing(_) => "indexing_error",
            Error::Llm(LlmError::Auth(_)) => "auth_error",
            Error::Llm(LlmError::RateLimited { .. }) => "rate_limit_error",
            Error::Llm(LlmError::Network(_)) | Error::Llm(LlmError::Timeout { .. }) => {
                "network_error"
            }
            Error::Llm(_) => "llm_error",
            Error::Retrieval(_) => "retrieval_error",
            Error::Prompt(_) => "prompt_error",
            Error::NotReady => "not_ready",
            Error::InvalidQuestion => "invalid_question",
            Error::SessionNotFound(_) => "not_found",
            Error::Upload(_) => "upload_error",
            Error::PayloadTooLarge(_) => "payload_too_large",
            Error::SessionLimit(_) => "session_limit",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Internal(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Error::Config(_) | Error::NotReady => StatusCode::PRECONDITION_FAILED,
            Error::Extraction { .. } | Error::Indexing(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::UnsupportedFileType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::Llm(LlmError::Auth(_)) | Error::Retrieval(LlmError::Auth(_)) => {
                StatusCode::UNAUTHORIZED
            }
            Error::Llm(LlmError::RateLimited { .. })
            | Error::Retrieval(LlmError::RateLimited { .. }) => StatusCode::TOO_MANY_REQUESTS,
            Error::Llm(_) | Error::Retrieval(_) => StatusCode::BAD_GATEWAY,
            Error::Prompt(_) | Error::Internal(_) | Error::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Error::InvalidQuestion | Error::Upload(_) | Error::Json(_) => StatusCode::BAD_REQUEST,
            Error::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::SessionLimit(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": {
                "type": self.kind(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            LlmError::from_status("gemini", 401, "bad key".into(), None),
            LlmError::Auth(_)
        ));
        assert!(matches!(
            LlmError::from_status("gemini", 429, String::new(), Some(3)),
            LlmError::RateLimited {
                provider: "gemini",
                retry_after_secs: Some(3)
            }
        ));
        assert!(matches!(
            LlmError::from_status("gemini", 500, String::new(), None),
            LlmError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn test_transient_errors() {
        assert!(LlmError::RateLimited {
            provider: "gemini",
            retry_after_secs: None
        }
        .is_transient());
        assert!(LlmError::Network("reset".into()).is_transient());
        assert!(LlmError::Timeout { secs: 5 }.is_transient());
        assert!(LlmError::Api { status: 503, body: String::new() }.is_transient());
        assert!(!LlmError::Api { status: 400, body: String::new() }.is_transient());
        assert!(!LlmError::Auth("denied".into()).is_transient());
    }

    #[test]
    fn test_error_kinds() {
        let err = Error::from(LlmError::Auth("denied".into()));
        assert_eq!(err.kind(), "auth_error");
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::NotReady.kind(), "not_ready");
        assert_eq!(
            Error::extraction("report.pdf", "broken xref").to_string(),
            "Failed to extract 'report.pdf': broken xref"
        );
    }

    #[test]
    fn test_retrieval_and_limit_statuses() {
        let err = Error::Retrieval(LlmError::Network("reset".into()));
        assert_eq!(err.kind(), "retrieval_error");
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            Error::Retrieval(LlmError::Auth("revoked".into())).status(),
            StatusCode::UNAUTHORIZED
        );

        assert_eq!(
            Error::PayloadTooLarge("limit is 1024 bytes".into()).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(Error::SessionLimit(3).status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
