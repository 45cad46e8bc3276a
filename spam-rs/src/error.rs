//! Error types for spam-rs

use thiserror::Error;

/// Result type alias for spam-rs operations
pub type Result<T> = std::result::Result<T, SpamError>;

#[derive(Error, Debug)]
pub enum SpamError {
    /// Empty set, single-class set, or no valid rows left after filtering
    #[error("Invalid training data: {0}")]
    InvalidTrainingData(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("OCR engine unavailable: {0}")]
    OcrEngineUnavailable(String),

    #[error("OCR timed out after {0}s")]
    OcrTimeout(u64),

    #[error("Threshold must be between 0 and 1, got {0}")]
    InvalidThreshold(f64),

    #[error("Input text is empty")]
    EmptyInput,

    /// OCR ran but nothing usable came out; carries remediation hints
    #[error("No text could be extracted from the image")]
    NoTextExtracted { suggestions: Vec<String> },

    #[error("Classification failed: {0}")]
    ClassificationFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SpamError {
    /// Errors the caller can fix by changing the request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SpamError::InvalidTrainingData(_)
                | SpamError::InvalidImage(_)
                | SpamError::InvalidThreshold(_)
                | SpamError::EmptyInput
                | SpamError::NoTextExtracted { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        assert!(SpamError::EmptyInput.is_client_error());
        assert!(SpamError::InvalidImage("bad".to_string()).is_client_error());
        assert!(SpamError::InvalidThreshold(1.5).is_client_error());
        assert!(!SpamError::OcrEngineUnavailable("missing".to_string()).is_client_error());
        assert!(!SpamError::ClassificationFailed("boom".to_string()).is_client_error());
    }

    #[test]
    fn test_display() {
        let err = SpamError::OcrTimeout(30);
        assert_eq!(err.to_string(), "OCR timed out after 30s");
    }
}
