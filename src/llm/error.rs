//! LLM error types

use thiserror::Error;

/// Errors that can occur while talking to the generative service.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Empty answer from the model")]
    EmptyResponse,

    #[error("Model answer contains no JSON object")]
    MissingJson,

    #[error("Invalid JSON in model answer: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// Whether the failure came from the content of the answer rather than transport.
    #[must_use]
    pub const fn is_malformed_answer(&self) -> bool {
        matches!(
            self,
            Self::EmptyResponse | Self::MissingJson | Self::InvalidJson(_) | Self::InvalidResponse(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_malformed_answer() {
        assert!(LlmError::MissingJson.is_malformed_answer());
        assert!(LlmError::EmptyResponse.is_malformed_answer());
        assert!(
            !LlmError::Api {
                status: 500,
                message: "Server error".to_owned()
            }
            .is_malformed_answer()
        );
    }

    #[test]
    fn test_display() {
        let err = LlmError::Api {
            status: 401,
            message: "bad key".to_owned(),
        };
        assert_eq!(err.to_string(), "API error 401: bad key");
    }
}
