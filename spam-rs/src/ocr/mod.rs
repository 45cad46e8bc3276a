//! Image text extraction: preprocessing, OCR engines and error correction

pub mod backend;
pub mod correction;
pub mod extractor;
pub mod preprocess;
pub mod tesseract;

pub use backend::{OcrEngine, OcrError, PageSegMode};
pub use correction::OcrCorrector;
pub use extractor::OcrExtractor;
pub use preprocess::decode_image_payload;
pub use tesseract::TesseractEngine;
