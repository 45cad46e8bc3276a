//! Multi-strategy text extraction
//!
//! Runs the engine on the preprocessed image once per configured page
//! segmentation mode and keeps the longest output. If every mode comes back
//! empty, the unprocessed image gets one last try with engine defaults.

use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use super::backend::{OcrEngine, OcrError, PageSegMode};
use super::correction::OcrCorrector;
use super::preprocess::{image_bytes, load_image, preprocess};
use crate::config::OcrConfig;
use crate::error::{Result, SpamError};
use crate::spam::normalizer::normalize;
use crate::spam::types::OcrResult;

/// Strategy label for the unprocessed fallback pass
pub const ORIGINAL_IMAGE_STRATEGY: &str = "original image";

/// Image-to-text extractor wrapping an [`OcrEngine`]
pub struct OcrExtractor {
    engine: Arc<dyn OcrEngine>,
    corrector: OcrCorrector,
    config: OcrConfig,
}

impl OcrExtractor {
    pub fn new(engine: Arc<dyn OcrEngine>, config: OcrConfig) -> Self {
        Self {
            engine,
            corrector: OcrCorrector::new(),
            config,
        }
    }

    pub fn engine(&self) -> &dyn OcrEngine {
        self.engine.as_ref()
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Whitespace-collapsed engine output, before error correction
    pub fn extract_text(&self, input: &[u8]) -> Result<String> {
        Ok(self.extract(input)?.raw_text)
    }

    /// Full extraction: best strategy output plus its corrected form.
    /// `input` is encoded image bytes or a base64 / data URL payload.
    pub fn extract(&self, input: &[u8]) -> Result<OcrResult> {
        let original = load_image(&image_bytes(input)?)?;

        if !self.engine.is_available() {
            return Err(SpamError::OcrEngineUnavailable(
                self.engine.availability_hint(),
            ));
        }

        let workdir = TempDir::new()?;
        let processed_path = workdir.path().join("processed.png");
        preprocess(&original, &self.config)
            .save(&processed_path)
            .map_err(|e| SpamError::InvalidImage(format!("cannot write preprocessed image: {}", e)))?;

        let mut runs = StrategyRuns::default();
        for &mode in &self.config.psm_modes {
            let mode = PageSegMode::from(mode);
            runs.record(
                mode.to_string(),
                self.engine.recognize(&processed_path, Some(mode)),
            );
        }

        if runs.best_text().is_empty() {
            debug!("Preprocessed image gave no text, trying original");
            let original_path = workdir.path().join("original.png");
            save_original(&original, &original_path)?;
            runs.record(
                ORIGINAL_IMAGE_STRATEGY.to_string(),
                self.engine.recognize(&original_path, None),
            );
        }

        let result = runs.finish(self.engine.name())?;
        let cleaned_text = self.corrector.correct(&result.raw_text);

        info!(
            engine = self.engine.name(),
            strategy = %result.strategy,
            chars = result.raw_text.len(),
            failed_strategies = result.failures.len(),
            "OCR extraction finished"
        );

        Ok(OcrResult {
            cleaned_text,
            ..result
        })
    }
}

fn save_original(image: &DynamicImage, path: &Path) -> Result<()> {
    image
        .save(path)
        .map_err(|e| SpamError::InvalidImage(format!("cannot write image: {}", e)))
}

/// Bookkeeping across strategy attempts
#[derive(Default)]
struct StrategyRuns {
    best: Option<(String, String)>,
    failures: Vec<String>,
    unavailable: Option<String>,
    succeeded: usize,
}

impl StrategyRuns {
    fn record(&mut self, strategy: String, outcome: std::result::Result<String, OcrError>) {
        match outcome {
            Ok(text) => {
                self.succeeded += 1;
                let text = normalize(&text);
                let longer = self
                    .best
                    .as_ref()
                    .map_or(true, |(_, best)| text.chars().count() > best.chars().count());
                if longer {
                    self.best = Some((strategy, text));
                }
            }
            Err(e) => {
                warn!(strategy = %strategy, error = %e, "OCR strategy failed");
                if let OcrError::EngineNotAvailable(hint) = &e {
                    self.unavailable = Some(hint.clone());
                }
                self.failures.push(format!("{}: {}", strategy, e));
            }
        }
    }

    fn best_text(&self) -> &str {
        self.best.as_ref().map_or("", |(_, text)| text.as_str())
    }

    fn finish(self, engine: &str) -> Result<OcrResult> {
        if self.succeeded == 0 {
            if let Some(hint) = self.unavailable {
                return Err(SpamError::OcrEngineUnavailable(hint));
            }
            return Err(SpamError::ClassificationFailed(format!(
                "all {} strategies failed: {}",
                engine,
                self.failures.join("; ")
            )));
        }

        let (strategy, raw_text) = self.best.unwrap_or_default();
        Ok(OcrResult {
            raw_text,
            cleaned_text: String::new(),
            strategy,
            failures: self.failures,
        })
    }
}
