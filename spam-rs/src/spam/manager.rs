//! Spam manager: the classification orchestrator
//!
//! Owns the active model, the training corpus and the OCR extractor.
//! Readers take an `Arc` snapshot of the model and never block on a
//! retrain; retrains are serialized and publish a whole new model.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, info, warn};

use super::classifier::{Model, ModelParams};
use super::keywords::top_keywords;
use super::normalizer::normalize;
use super::store::{LoadedModel, ModelStore};
use super::types::*;
use crate::config::Config;
use crate::error::{Result, SpamError};
use crate::ocr::{OcrEngine, OcrExtractor, TesseractEngine};

/// Source tag for classifications that went through OCR
pub const OCR_SOURCE: &str = "ocr";

/// Hints returned when an image yields no usable text
pub const NO_TEXT_SUGGESTIONS: [&str; 3] = [
    "Ensure the image is clear and high resolution",
    "Make sure the text is clearly visible",
    "Try adjusting the image contrast or brightness",
];

/// Spam manager
pub struct SpamManager {
    model: RwLock<Arc<Model>>,
    /// Guards the corpus and serializes retraining
    corpus: Mutex<TrainingSet>,
    store: ModelStore,
    params: ModelParams,
    threshold: f64,
    top_k: usize,
    extractor: OcrExtractor,
}

impl SpamManager {
    /// Build a manager around an already trained model
    pub fn new(
        model: Model,
        corpus: TrainingSet,
        store: ModelStore,
        config: &Config,
        engine: Arc<dyn OcrEngine>,
    ) -> Self {
        Self {
            model: RwLock::new(Arc::new(model)),
            corpus: Mutex::new(corpus),
            store,
            params: ModelParams::from(&config.classifier),
            threshold: config.classifier.threshold,
            top_k: config.classifier.top_k,
            extractor: OcrExtractor::new(engine, config.ocr.clone()),
        }
    }

    /// Load (or bootstrap) the model from disk and use Tesseract for OCR
    pub fn open(config: &Config) -> Result<Self> {
        let engine = Arc::new(TesseractEngine::from_config(&config.ocr));
        Self::open_with_engine(config, engine)
    }

    pub fn open_with_engine(config: &Config, engine: Arc<dyn OcrEngine>) -> Result<Self> {
        let store = ModelStore::from_config(&config.classifier);
        let LoadedModel { model, corpus } =
            store.load_or_create_default(&ModelParams::from(&config.classifier))?;
        Ok(Self::new(model, corpus, store, config, engine))
    }

    /// Snapshot of the active model
    pub fn model(&self) -> Arc<Model> {
        self.model
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn extractor(&self) -> &OcrExtractor {
        &self.extractor
    }

    /// Classify a piece of text. `threshold` overrides the configured one.
    pub fn classify_text(&self, text: &str, threshold: Option<f64>) -> Result<ClassificationResult> {
        let threshold = self.resolve_threshold(threshold)?;

        let normalized_text = normalize(text);
        if normalized_text.is_empty() {
            return Err(SpamError::EmptyInput);
        }

        let model = self.model();
        let spam_probability = model.predict_proba(&normalized_text);
        if !(0.0..=1.0).contains(&spam_probability) {
            return Err(SpamError::ClassificationFailed(format!(
                "probability out of range: {}",
                spam_probability
            )));
        }
        let keywords = top_keywords(model.as_ref(), &normalized_text, self.top_k);
        let is_spam = spam_probability > threshold;

        debug!(
            is_spam,
            confidence = spam_probability,
            threshold,
            text_length = normalized_text.len(),
            "Classified text"
        );

        Ok(ClassificationResult {
            is_spam,
            spam_probability,
            threshold,
            keywords,
            normalized_text,
        })
    }

    /// Extract text from an image, correct OCR errors, then classify it
    pub fn classify_image(&self, image_bytes: &[u8], threshold: Option<f64>) -> Result<ImageClassification> {
        let threshold = self.resolve_threshold(threshold)?;
        let ocr = self.extractor.extract(image_bytes)?;

        if ocr.cleaned_text.trim().is_empty() {
            warn!(
                strategy = %ocr.strategy,
                failed_strategies = ocr.failures.len(),
                "No text extracted from image"
            );
            return Err(SpamError::NoTextExtracted {
                suggestions: NO_TEXT_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
            });
        }

        let result = self.classify_text(&ocr.cleaned_text, Some(threshold))?;
        info!(
            is_spam = result.is_spam,
            confidence = result.spam_probability,
            extracted_length = ocr.raw_text.len(),
            "Classified image"
        );

        Ok(ImageClassification {
            result,
            ocr,
            source: OCR_SOURCE.to_string(),
        })
    }

    /// Train on `rows` (merged with or replacing the corpus), persist, and
    /// swap the new model in. The old model stays active on any failure.
    pub fn retrain(&self, rows: TrainingSet, mode: RetrainMode) -> Result<TrainingReport> {
        if rows.is_empty() {
            return Err(SpamError::InvalidTrainingData(
                "no valid training rows provided".to_string(),
            ));
        }

        let mut corpus = self.corpus.lock().unwrap_or_else(PoisonError::into_inner);
        let new_samples = rows.len();
        let candidate = match mode {
            RetrainMode::Append => {
                let mut merged = corpus.clone();
                merged.extend(rows);
                merged
            }
            RetrainMode::Replace => rows,
        };

        let model = Model::train(&candidate, &self.params)?;
        let accuracy = model.accuracy(&candidate);

        self.store.save(&model, &candidate)?;

        let report = TrainingReport {
            total_samples: candidate.len(),
            new_samples,
            spam_samples: candidate.count(Label::Spam),
            ham_samples: candidate.count(Label::Ham),
            accuracy,
        };

        *self.model.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(model);
        *corpus = candidate;

        info!(
            total_samples = report.total_samples,
            new_samples = report.new_samples,
            accuracy = report.accuracy,
            ?mode,
            "Retrained spam model"
        );

        Ok(report)
    }

    pub fn model_info(&self) -> ModelInfo {
        let model = self.model();
        ModelInfo {
            vocabulary_size: model.vocabulary_size(),
            spam_samples: model.class_count(Label::Spam),
            ham_samples: model.class_count(Label::Ham),
            threshold: self.threshold,
        }
    }

    fn resolve_threshold(&self, threshold: Option<f64>) -> Result<f64> {
        match threshold {
            None => Ok(self.threshold),
            Some(t) if (0.0..=1.0).contains(&t) => Ok(t),
            Some(t) => Err(SpamError::InvalidThreshold(t)),
        }
    }
}

/// Validate request rows strictly: every row needs text and a 0/1 label
pub fn validate_rows(rows: Vec<RawTrainingRow>) -> Result<TrainingSet> {
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| {
            let text = row.text.ok_or_else(|| {
                SpamError::InvalidTrainingData(format!("row {}: missing text", i))
            })?;
            let label = row
                .label
                .ok_or_else(|| SpamError::InvalidTrainingData(format!("row {}: missing label", i)))
                .and_then(|l| {
                    Label::try_from(l)
                        .map_err(|e| SpamError::InvalidTrainingData(format!("row {}: {}", i, e)))
                })?;
            Ok(TrainingExample::new(text, label))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{OcrError, PageSegMode};
    use image::{DynamicImage, GrayImage, ImageFormat, Luma};
    use std::io::Cursor;
    use std::path::Path;
    use tempfile::TempDir;

    /// Engine returning the same text for every call
    struct FixedEngine(&'static str);

    impl OcrEngine for FixedEngine {
        fn name(&self) -> &str {
            "fixed"
        }
        fn is_available(&self) -> bool {
            true
        }
        fn availability_hint(&self) -> String {
            String::new()
        }
        fn recognize(&self, _: &Path, _: Option<PageSegMode>) -> std::result::Result<String, OcrError> {
            Ok(self.0.to_string())
        }
    }

    fn scenario_set() -> TrainingSet {
        TrainingSet::new(vec![
            TrainingExample::new("Win a free iPhone now!", Label::Spam),
            TrainingExample::new("Meeting at 3pm tomorrow", Label::Ham),
            TrainingExample::new("Limited time offer!", Label::Spam),
            TrainingExample::new("Your account statement", Label::Ham),
        ])
    }

    fn manager(dir: &TempDir, ocr_text: &'static str) -> SpamManager {
        let mut config = Config::default();
        config.classifier.model_path = dir.path().join("model.json");
        config.classifier.training_data_path = dir.path().join("corpus.json");
        let store = ModelStore::from_config(&config.classifier);
        let corpus = scenario_set();
        let model = Model::train(&corpus, &ModelParams::default()).unwrap();
        SpamManager::new(model, corpus, store, &config, Arc::new(FixedEngine(ocr_text)))
    }

    fn png() -> Vec<u8> {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([255u8])));
        let mut buf = Vec::new();
        image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    #[test]
    fn test_classify_scenario() {
        let dir = TempDir::new().unwrap();
        let result = manager(&dir, "").classify_text("Win a free prize now!", None).unwrap();
        assert!(result.is_spam);
        assert!(result.spam_probability > 0.6);
        assert_eq!(result.threshold, 0.6);
        assert!(result.keywords.contains(&"free".to_string()));
        assert!(result.keywords.contains(&"win".to_string()));
        assert_eq!(result.label(), Label::Spam);
    }

    #[test]
    fn test_threshold_is_strict() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir, "");
        let p = manager.classify_text("Win a free prize now!", None).unwrap().spam_probability;

        assert!(!manager.classify_text("Win a free prize now!", Some(p)).unwrap().is_spam);
        assert!(manager.classify_text("Win a free prize now!", Some(p - 1e-9)).unwrap().is_spam);
    }

    #[test]
    fn test_invalid_threshold() {
        let dir = TempDir::new().unwrap();
        let err = manager(&dir, "").classify_text("hello", Some(1.5)).unwrap_err();
        assert!(matches!(err, SpamError::InvalidThreshold(_)));
    }

    #[test]
    fn test_blank_text() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir, "");
        assert!(matches!(manager.classify_text("", None), Err(SpamError::EmptyInput)));
        assert!(matches!(manager.classify_text(" \t\n ", None), Err(SpamError::EmptyInput)));
    }

    #[test]
    fn test_classify_image() {
        let dir = TempDir::new().unwrap();
        let classification = manager(&dir, "W1N a FR33 PR1ZE n0w")
            .classify_image(&png(), None)
            .unwrap();
        assert_eq!(classification.source, OCR_SOURCE);
        assert_eq!(classification.ocr.raw_text, "W1N a FR33 PR1ZE n0w");
        assert_eq!(classification.result.normalized_text, "WIN a FREE PRIZE now");
        assert!(classification.result.is_spam);
    }

    #[test]
    fn test_image_without_text() {
        let dir = TempDir::new().unwrap();
        let err = manager(&dir, "  ~~ ").classify_image(&png(), None).unwrap_err();
        match err {
            SpamError::NoTextExtracted { suggestions } => assert_eq!(suggestions.len(), 3),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_retrain_append_and_replace() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir, "");
        let rows = TrainingSet::new(vec![
            TrainingExample::new("cheap pills online", Label::Spam),
            TrainingExample::new("lunch on friday?", Label::Ham),
        ]);

        let report = manager.retrain(rows.clone(), RetrainMode::Append).unwrap();
        assert_eq!(report.total_samples, 6);
        assert_eq!(report.new_samples, 2);
        assert_eq!(report.spam_samples, 3);
        assert_eq!(report.ham_samples, 3);
        assert!((0.0..=1.0).contains(&report.accuracy));
        assert_eq!(manager.model_info().spam_samples, 3);

        let report = manager.retrain(rows, RetrainMode::Replace).unwrap();
        assert_eq!(report.total_samples, 2);
        assert!(dir.path().join("model.json").exists());
        assert!(dir.path().join("corpus.json").exists());
    }

    #[test]
    fn test_failed_retrain_keeps_model() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir, "");
        let before = manager.model();

        let rows = TrainingSet::new(vec![TrainingExample::new("only spam here", Label::Spam)]);
        let err = manager.retrain(rows, RetrainMode::Replace).unwrap_err();
        assert!(matches!(err, SpamError::InvalidTrainingData(_)));
        assert!(Arc::ptr_eq(&before, &manager.model()));

        let err = manager.retrain(TrainingSet::default(), RetrainMode::Append).unwrap_err();
        assert!(matches!(err, SpamError::InvalidTrainingData(_)));
    }

    #[test]
    fn test_persist_failure_keeps_model_and_corpus() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let corpus_path = dir.path().join("corpus.json");

        let mut config = Config::default();
        config.classifier.model_path = blocker.join("model.json");
        config.classifier.training_data_path = corpus_path.clone();
        let store = ModelStore::from_config(&config.classifier);
        let corpus = scenario_set();
        store.save_corpus(&corpus).unwrap();
        let model = Model::train(&corpus, &ModelParams::default()).unwrap();
        let engine = Arc::new(FixedEngine(""));
        let manager = SpamManager::new(model, corpus.clone(), store.clone(), &config, engine);
        let before = manager.model();

        let rows = TrainingSet::new(vec![TrainingExample::new("cheap pills online", Label::Spam)]);
        assert!(manager.retrain(rows, RetrainMode::Append).is_err());

        assert!(Arc::ptr_eq(&before, &manager.model()));
        assert_eq!(store.load_corpus().unwrap().unwrap(), corpus);
    }

    #[test]
    fn test_snapshot_survives_retrain() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir, "");
        let snapshot = manager.model();
        let p = snapshot.predict_proba("free offer");

        manager
            .retrain(
                TrainingSet::new(vec![
                    TrainingExample::new("free offer", Label::Ham),
                    TrainingExample::new("spammy spam", Label::Spam),
                ]),
                RetrainMode::Replace,
            )
            .unwrap();

        assert_eq!(snapshot.predict_proba("free offer"), p);
        assert!(!Arc::ptr_eq(&snapshot, &manager.model()));
    }

    #[test]
    fn test_validate_rows() {
        let ok = validate_rows(vec![
            RawTrainingRow { text: Some("a b".into()), label: Some(1) },
            RawTrainingRow { text: Some("c d".into()), label: Some(0) },
        ])
        .unwrap();
        assert_eq!(ok.len(), 2);

        let bad = validate_rows(vec![RawTrainingRow { text: Some("x".into()), label: Some(2) }]);
        assert!(matches!(bad, Err(SpamError::InvalidTrainingData(msg)) if msg.contains("row 0")));
        let missing = validate_rows(vec![RawTrainingRow { text: None, label: Some(1) }]);
        assert!(missing.is_err());
    }
}
