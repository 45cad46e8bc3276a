//! Spam types and data structures

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Class label. Serialized as `0` (ham) or `1` (spam).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Label {
    Ham,
    Spam,
}

impl Label {
    /// All labels, in feature-matrix row order
    pub const ALL: [Label; 2] = [Label::Ham, Label::Spam];

    pub fn index(self) -> usize {
        match self {
            Label::Ham => 0,
            Label::Spam => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Ham => "ham",
            Label::Spam => "spam",
        }
    }
}

impl TryFrom<i64> for Label {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Label::Ham),
            1 => Ok(Label::Spam),
            other => Err(format!("label must be 0 or 1, got {}", other)),
        }
    }
}

impl From<Label> for i64 {
    fn from(label: Label) -> Self {
        label.index() as i64
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One labelled training text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub text: String,
    pub label: Label,
}

impl TrainingExample {
    pub fn new(text: impl Into<String>, label: Label) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

/// Unvalidated training row as it arrives from a file or request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTrainingRow {
    pub text: Option<String>,
    pub label: Option<i64>,
}

impl RawTrainingRow {
    fn validate(self) -> Option<TrainingExample> {
        let text = self.text?;
        let label = Label::try_from(self.label?).ok()?;
        Some(TrainingExample { text, label })
    }
}

/// Ordered training corpus; duplicates allowed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrainingSet {
    examples: Vec<TrainingExample>,
}

impl TrainingSet {
    pub fn new(examples: Vec<TrainingExample>) -> Self {
        Self { examples }
    }

    /// Keep rows that have both text and a 0/1 label; log how many were dropped
    pub fn from_raw_rows(rows: Vec<RawTrainingRow>) -> Self {
        let total = rows.len();
        let examples: Vec<TrainingExample> =
            rows.into_iter().filter_map(RawTrainingRow::validate).collect();

        let dropped = total - examples.len();
        if dropped > 0 {
            warn!(invalid_count = dropped, total, "Dropped invalid training rows");
        }

        Self { examples }
    }

    pub fn push(&mut self, example: TrainingExample) {
        self.examples.push(example);
    }

    pub fn extend(&mut self, other: TrainingSet) {
        self.examples.extend(other.examples);
    }

    pub fn examples(&self) -> &[TrainingExample] {
        &self.examples
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn count(&self, label: Label) -> usize {
        self.examples.iter().filter(|e| e.label == label).count()
    }

    /// Small built-in corpus used when no model or corpus is on disk
    pub fn builtin() -> Self {
        let rows = [
            ("Win a free iPhone now!", Label::Spam),
            ("Meeting at 3pm tomorrow", Label::Ham),
            ("Limited time offer!", Label::Spam),
            ("Your account statement", Label::Ham),
            ("Congratulations! You've won $1000! Click here now!", Label::Spam),
            ("Get rich quick! Make money fast!", Label::Spam),
            ("Free trial! Limited time offer!", Label::Spam),
            ("Meeting scheduled for tomorrow at 2 PM", Label::Ham),
            ("Please review the attached document", Label::Ham),
            ("How was your weekend?", Label::Ham),
        ];

        Self::new(
            rows.into_iter()
                .map(|(text, label)| TrainingExample::new(text, label))
                .collect(),
        )
    }
}

impl FromIterator<TrainingExample> for TrainingSet {
    fn from_iter<I: IntoIterator<Item = TrainingExample>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// How a retrain request treats the stored corpus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetrainMode {
    /// New rows are added to the stored corpus
    #[default]
    Append,
    /// New rows become the whole corpus
    Replace,
}

/// Outcome of a text classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub is_spam: bool,
    pub spam_probability: f64,
    pub threshold: f64,
    /// At most k tokens, most relevant first
    pub keywords: Vec<String>,
    pub normalized_text: String,
}

impl ClassificationResult {
    pub fn label(&self) -> Label {
        if self.is_spam {
            Label::Spam
        } else {
            Label::Ham
        }
    }
}

/// Text pulled out of an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    /// Engine output with whitespace collapsed
    pub raw_text: String,
    /// After OCR error correction
    pub cleaned_text: String,
    /// Which strategy produced `raw_text`
    pub strategy: String,
    /// Strategies that failed, with their reasons
    pub failures: Vec<String>,
}

/// Outcome of an image classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageClassification {
    pub result: ClassificationResult,
    /// Extraction details, including the uncorrected engine output
    pub ocr: OcrResult,
    pub source: String,
}

/// Summary returned after retraining
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub total_samples: usize,
    pub new_samples: usize,
    pub spam_samples: usize,
    pub ham_samples: usize,
    /// Accuracy on the training corpus itself
    pub accuracy: f64,
}

/// Snapshot of the active model
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub vocabulary_size: usize,
    pub spam_samples: usize,
    pub ham_samples: usize,
    pub threshold: f64,
}
