//! Tesseract OCR engine.
//!
//! Runs the `tesseract` command-line binary; no native bindings needed.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use super::backend::{OcrEngine, OcrError, PageSegMode};
use crate::config::OcrConfig;

/// Tesseract OCR via command-line.
pub struct TesseractEngine {
    command: String,
    language: String,
}

impl TesseractEngine {
    pub fn new(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(config.tesseract_cmd.clone(), config.language.clone())
    }

    fn missing_hint(&self) -> String {
        format!(
            "{} not found (install tesseract-ocr, e.g. apt install tesseract-ocr)",
            self.command
        )
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("tesseract", "eng")
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn is_available(&self) -> bool {
        Command::new(&self.command)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn availability_hint(&self) -> String {
        if self.is_available() {
            "Tesseract is available".to_string()
        } else {
            self.missing_hint()
        }
    }

    fn recognize(&self, image_path: &Path, mode: Option<PageSegMode>) -> Result<String, OcrError> {
        let mut command = Command::new(&self.command);
        command
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.language]);
        if let Some(mode) = mode {
            command.args(["--psm", &mode.as_u8().to_string()]);
        }

        debug!(image = %image_path.display(), ?mode, "Running tesseract");

        match command.output() {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(OcrError::OcrFailed(format!("tesseract failed: {}", stderr.trim())))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(OcrError::EngineNotAvailable(self.missing_hint()))
            }
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}
