//! Multinomial naive Bayes over TF-IDF features
//!
//! A [`Model`] is immutable once trained. Retraining builds a new one;
//! callers swap references instead of mutating in place.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::types::{Label, TrainingSet};
use super::vectorizer::{FeatureVector, TfidfVectorizer, VectorizerConfig};
use crate::config::ClassifierConfig;
use crate::error::{Result, SpamError};

/// Hyper-parameters used at training time
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    pub vectorizer: VectorizerConfig,
    /// Additive smoothing pseudo-count
    pub alpha: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            vectorizer: VectorizerConfig::default(),
            alpha: 1.0,
        }
    }
}

impl From<&ClassifierConfig> for ModelParams {
    fn from(config: &ClassifierConfig) -> Self {
        Self {
            vectorizer: VectorizerConfig {
                ngram_min: config.ngram_min,
                ngram_max: config.ngram_max,
                stemming: config.stemming,
            },
            alpha: config.alpha,
        }
    }
}

/// Read-only view of a trained model, for consumers that rank features
pub trait ModelView {
    /// Vocabulary in feature-index order
    fn vocabulary(&self) -> &[String];

    /// Smoothed `log P(token | class)`, `None` for unknown tokens
    fn class_log_prob(&self, class: Label, token: &str) -> Option<f64>;

    /// `log P(class)`
    fn class_prior(&self, class: Label) -> f64;

    /// TF-IDF vector of `text` in this model's feature space
    fn vectorize(&self, text: &str) -> FeatureVector;
}

/// Trained spam classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    vectorizer: TfidfVectorizer,
    alpha: f64,
    /// Training samples per class, indexed by `Label::index`
    class_count: [usize; 2],
    class_log_prior: [f64; 2],
    feature_log_prob: [Vec<f64>; 2],
}

impl Model {
    /// Fit vectorizer and naive Bayes parameters on a training set
    pub fn train(set: &TrainingSet, params: &ModelParams) -> Result<Self> {
        if set.is_empty() {
            return Err(SpamError::InvalidTrainingData(
                "training set is empty".to_string(),
            ));
        }

        let class_count = [set.count(Label::Ham), set.count(Label::Spam)];
        if class_count.iter().any(|&c| c == 0) {
            return Err(SpamError::InvalidTrainingData(format!(
                "training set needs both classes (ham: {}, spam: {})",
                class_count[0], class_count[1]
            )));
        }

        let texts: Vec<&str> = set.examples().iter().map(|e| e.text.as_str()).collect();
        let vectorizer = TfidfVectorizer::fit(&texts, params.vectorizer.clone());
        if vectorizer.is_empty() {
            return Err(SpamError::InvalidTrainingData(
                "training texts contain no usable tokens".to_string(),
            ));
        }

        let n_features = vectorizer.len();
        let mut feature_totals = [vec![0.0f64; n_features], vec![0.0f64; n_features]];
        for example in set.examples() {
            let row = &mut feature_totals[example.label.index()];
            for (index, weight) in vectorizer.transform(&example.text) {
                row[index] += weight;
            }
        }

        let smoothed_vocab = params.alpha * n_features as f64;
        let feature_log_prob = feature_totals.map(|totals| {
            let denominator = (totals.iter().sum::<f64>() + smoothed_vocab).ln();
            totals
                .iter()
                .map(|&total| (total + params.alpha).ln() - denominator)
                .collect::<Vec<f64>>()
        });

        let n = set.len() as f64;
        let class_log_prior = class_count.map(|count| (count as f64 / n).ln());

        info!(
            samples = set.len(),
            spam_samples = class_count[Label::Spam.index()],
            ham_samples = class_count[Label::Ham.index()],
            vocabulary_size = n_features,
            "Trained spam model"
        );

        Ok(Self {
            vectorizer,
            alpha: params.alpha,
            class_count,
            class_log_prior,
            feature_log_prob,
        })
    }

    /// Reject a deserialized model whose parts disagree; predicting with
    /// one would index out of bounds
    pub fn validate(&self) -> Result<()> {
        let inconsistent =
            |reason: String| SpamError::ClassificationFailed(format!("inconsistent model: {}", reason));

        self.vectorizer.check().map_err(inconsistent)?;
        let n_features = self.vectorizer.len();
        for label in Label::ALL {
            let row = &self.feature_log_prob[label.index()];
            if row.len() != n_features {
                return Err(inconsistent(format!(
                    "{} {} log-probabilities for {} features",
                    row.len(),
                    label,
                    n_features
                )));
            }
            let prior = self.class_log_prior[label.index()];
            if !prior.is_finite() || row.iter().any(|p| !p.is_finite()) {
                return Err(inconsistent(format!("non-finite {} parameters", label)));
            }
        }
        Ok(())
    }

    /// Joint log-likelihood per class for an already vectorized document
    fn joint_log_likelihood(&self, vector: &FeatureVector) -> [f64; 2] {
        Label::ALL.map(|label| {
            let flp = &self.feature_log_prob[label.index()];
            vector
                .iter()
                .fold(self.class_log_prior[label.index()], |acc, &(index, weight)| {
                    acc + weight * flp[index]
                })
        })
    }

    /// Probability that `text` is spam
    pub fn predict_proba(&self, text: &str) -> f64 {
        let vector = self.vectorizer.transform(text);
        let jll = self.joint_log_likelihood(&vector);

        // Two-class softmax; exp overflow saturates to 0.0 rather than NaN
        let margin = jll[Label::Ham.index()] - jll[Label::Spam.index()];
        let probability = 1.0 / (1.0 + margin.exp());

        debug!(known_tokens = vector.len(), probability, "Computed spam probability");
        probability
    }

    /// Most likely label (ties go to ham)
    pub fn predict(&self, text: &str) -> Label {
        if self.predict_proba(text) > 0.5 {
            Label::Spam
        } else {
            Label::Ham
        }
    }

    /// Fraction of `set` this model labels correctly
    pub fn accuracy(&self, set: &TrainingSet) -> f64 {
        if set.is_empty() {
            return 0.0;
        }
        let correct = set
            .examples()
            .iter()
            .filter(|e| self.predict(&e.text) == e.label)
            .count();
        correct as f64 / set.len() as f64
    }

    pub fn class_count(&self, label: Label) -> usize {
        self.class_count[label.index()]
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vectorizer.len()
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }
}

impl ModelView for Model {
    fn vocabulary(&self) -> &[String] {
        self.vectorizer.terms()
    }

    fn class_log_prob(&self, class: Label, token: &str) -> Option<f64> {
        let index = self.vectorizer.index_of(token)?;
        self.feature_log_prob[class.index()].get(index).copied()
    }

    fn class_prior(&self, class: Label) -> f64 {
        self.class_log_prior[class.index()]
    }

    fn vectorize(&self, text: &str) -> FeatureVector {
        self.vectorizer.transform(text)
    }
}
