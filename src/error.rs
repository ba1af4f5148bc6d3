//! Error handling and custom error types
//!
//! Errors in this enum are raised to the caller. Model misbehaviour is not an
//! error here; it is recovered into a [`crate::models::CaptionFailure`].

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image codec error: {0}")]
    ImageCodec(#[from] image::ImageError),

    #[error("Unsupported image format: {0} (expected JPEG or PNG)")]
    UnsupportedFormat(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("AI provider error: {0}")]
    AiProvider(String),

    #[error("Vision backend timed out after {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invariant violation: {0}")]
    Invariant(String),
}

impl Error {
    /// True for errors that indicate programmer or configuration mistakes
    /// rather than a flaky upstream.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedFormat(_)
                | Error::ImageCodec(_)
                | Error::MissingCredential(_)
                | Error::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_classification() {
        assert!(Error::UnsupportedFormat("gif".to_string()).is_precondition());
        assert!(Error::MissingCredential("OPENAI_API_KEY".to_string()).is_precondition());
        assert!(!Error::AiProvider("rate limited".to_string()).is_precondition());
        assert!(!Error::Timeout(Duration::from_secs(30)).is_precondition());
        assert!(!Error::Invariant("join".to_string()).is_precondition());
    }

    #[test]
    fn test_unsupported_format_message() {
        let err = Error::UnsupportedFormat("GIF".to_string());
        assert_eq!(
            err.to_string(),
            "Unsupported image format: GIF (expected JPEG or PNG)"
        );
    }
}
