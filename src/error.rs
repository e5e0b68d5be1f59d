//! Custom error types for rustabit.
//!
//! All library functions return `Result<T, AdvisorError>` instead of using `unwrap()`.
//! The public `Advisor` operations never surface these to their callers; they are
//! logged and mapped to fixed user-facing text.

use thiserror::Error;

/// Main error type for rustabit operations.
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// HTML or model payload parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Rate limited by external API
    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    /// External API returned an error
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: i32,
        /// Error message from API
        message: String,
    },

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Record store failure
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type alias using `AdvisorError`
pub type Result<T> = std::result::Result<T, AdvisorError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a parse error message
    fn ok_or_parse(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| AdvisorError::Parse(msg.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_or_parse() {
        let missing: Option<u8> = None;
        match missing.ok_or_parse("no h1") {
            Err(AdvisorError::Parse(msg)) => assert_eq!(msg, "no h1"),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(Some(3).ok_or_parse("x").ok(), Some(3));
    }

    #[test]
    fn test_api_error_display() {
        let err = AdvisorError::Api {
            code: 401,
            message: "bad key".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 401 - bad key");
    }
}
