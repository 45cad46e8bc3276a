//! OCR engine abstraction
//!
//! The extractor only needs "turn this image file into text"; the engine
//! behind it is swappable (Tesseract CLI in production, scripted engines
//! in tests).

use std::path::Path;
use thiserror::Error;

use crate::error::SpamError;

/// Errors from OCR engines.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Engine not available: {0}")]
    EngineNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<OcrError> for SpamError {
    fn from(err: OcrError) -> Self {
        match err {
            OcrError::EngineNotAvailable(hint) => SpamError::OcrEngineUnavailable(hint),
            OcrError::OcrFailed(msg) => SpamError::ClassificationFailed(msg),
            OcrError::Io(e) => SpamError::Io(e),
        }
    }
}

/// Tesseract page segmentation modes used by the extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSegMode {
    /// 3: fully automatic page segmentation
    Auto,
    /// 6: a single uniform block of text
    SingleBlock,
    /// 7: a single text line
    SingleLine,
    /// 8: a single word
    SingleWord,
    Other(u8),
}

impl PageSegMode {
    pub fn as_u8(self) -> u8 {
        match self {
            PageSegMode::Auto => 3,
            PageSegMode::SingleBlock => 6,
            PageSegMode::SingleLine => 7,
            PageSegMode::SingleWord => 8,
            PageSegMode::Other(mode) => mode,
        }
    }
}

impl From<u8> for PageSegMode {
    fn from(mode: u8) -> Self {
        match mode {
            3 => PageSegMode::Auto,
            6 => PageSegMode::SingleBlock,
            7 => PageSegMode::SingleLine,
            8 => PageSegMode::SingleWord,
            other => PageSegMode::Other(other),
        }
    }
}

impl std::fmt::Display for PageSegMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "psm {}", self.as_u8())
    }
}

/// Trait for OCR engines.
pub trait OcrEngine: Send + Sync {
    /// Short engine name for logs.
    fn name(&self) -> &str;

    /// Check if the engine can run (binary installed, models present).
    fn is_available(&self) -> bool;

    /// What's needed to make this engine available.
    fn availability_hint(&self) -> String;

    /// Extract text from an image file. `None` leaves segmentation to the engine default.
    fn recognize(&self, image_path: &Path, mode: Option<PageSegMode>) -> Result<String, OcrError>;
}
