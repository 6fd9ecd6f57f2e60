//! Error types for chainhook handling

use thiserror::Error;

/// Errors that can occur while receiving, processing or managing chainhooks
#[derive(Error, Debug)]
pub enum ChainhookError {
    /// Signature header missing or not matching the shared secret
    #[error("Invalid signature")]
    AuthenticationFailure,

    /// Delivery body is not a valid chainhook payload
    #[error("Malformed payload: {0}")]
    MalformedPayload(#[source] serde_json::Error),

    /// A handler hook failed for a single block, transaction or event
    #[error("Processing failed during {stage}: {reason}")]
    Processing { stage: String, reason: String },

    /// The processing queue has no free slots
    #[error("Processing queue is full")]
    QueueFull,

    /// The processing worker has stopped
    #[error("Processing queue is closed")]
    QueueClosed,

    /// The chainhooks API answered with a non-success status
    #[error("Chainhooks API returned status {status}: {body}")]
    Api { status: u16, body: String },

    /// Request rejected before reaching the chainhooks API
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL construction error
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// JSON error outside of payload parsing
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

/// Result type for chainhook operations
pub type Result<T> = std::result::Result<T, ChainhookError>;

impl ChainhookError {
    /// Build a processing error for the given stage
    pub fn processing(stage: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Processing {
            stage: stage.into(),
            reason: reason.to_string(),
        }
    }

    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AuthenticationFailure => "authentication",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::Processing { .. } => "processing",
            Self::QueueFull => "queue_full",
            Self::QueueClosed => "queue_closed",
            Self::Api { .. } => "api",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Http(_) => "http",
            Self::Url(_) => "url",
            Self::Json(_) => "json",
            Self::Other(_) => "other",
        }
    }
}

/// Extension trait for adding context to errors
pub trait ChainhookErrorContext<T> {
    /// Add chainhook name context to the error
    fn chainhook_context(self, chainhook: &str) -> Result<T>;

    /// Add block context to the error
    fn block_context(self, index: u64, hash: &str) -> Result<T>;
}

impl<T, E> ChainhookErrorContext<T> for std::result::Result<T, E>
where
    E: Into<ChainhookError>,
{
    fn chainhook_context(self, chainhook: &str) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            match err {
                ChainhookError::Other(msg) => {
                    ChainhookError::Other(format!("Error in chainhook '{chainhook}': {msg}"))
                }
                ChainhookError::Processing { stage, reason } => ChainhookError::Processing {
                    stage,
                    reason: format!("chainhook '{chainhook}': {reason}"),
                },
                _ => err,
            }
        })
    }

    fn block_context(self, index: u64, hash: &str) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            match err {
                ChainhookError::Other(msg) => {
                    ChainhookError::Other(format!("Error at block #{index} ({hash}): {msg}"))
                }
                ChainhookError::Processing { stage, reason } => ChainhookError::Processing {
                    stage,
                    reason: format!("block #{index} ({hash}): {reason}"),
                },
                _ => err,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ChainhookError::AuthenticationFailure;
        assert_eq!(err.to_string(), "Invalid signature");

        let err = ChainhookError::Api {
            status: 404,
            body: "not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Chainhooks API returned status 404: not found"
        );

        let err = ChainhookError::processing("apply_contract_call", "db unavailable");
        assert_eq!(
            err.to_string(),
            "Processing failed during apply_contract_call: db unavailable"
        );
    }

    #[test]
    fn test_error_context() {
        fn failing_operation() -> Result<()> {
            Err(ChainhookError::Other("Something went wrong".to_string()))
        }

        let result = failing_operation().chainhook_context("nft-listener");
        assert_eq!(
            result.unwrap_err().to_string(),
            "Error in chainhook 'nft-listener': Something went wrong"
        );

        let result: Result<()> =
            Err(ChainhookError::processing("apply_rollback", "boom")).block_context(42, "0xabc");
        assert_eq!(
            result.unwrap_err().to_string(),
            "Processing failed during apply_rollback: block #42 (0xabc): boom"
        );
    }

    #[test]
    fn test_malformed_payload_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = ChainhookError::MalformedPayload(json_err);
        assert_eq!(err.kind(), "malformed_payload");
        assert!(err.to_string().starts_with("Malformed payload:"));
    }
}
